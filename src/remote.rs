//! Transifex远程API抽象
//!
//! `TransifexApi` 以记录为单位描述平台能力；HTTP实现见 `http_api`，
//! 测试中使用内存实现 `fake::FakeTransifex`。

use url::Url;

use crate::encoding::RawContent;
use crate::error::Result;

/// 惰性列表：逐页拉取，只能遍历一次，重新查询即重新开始
pub type Listing<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRecord {
    pub id: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub source_language: Option<String>,
    pub private: bool,
    pub repository_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub i18n_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRecord {
    pub id: String,
    pub code: String,
}

/// 创建项目所需字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub slug: String,
    pub source_language: LanguageRecord,
    pub private: bool,
    pub repository_url: Option<String>,
}

/// 创建资源所需字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    pub name: String,
    pub slug: String,
    pub i18n_format: String,
}

/// Transifex平台能力
///
/// 查询类方法在对象不存在时返回 `Ok(None)`，由调用方决定是否创建。
pub trait TransifexApi {
    /// 按slug查找组织
    fn organization(&self, slug: &str) -> Result<Option<OrganizationRecord>>;

    fn project(&self, organization: &OrganizationRecord, slug: &str) -> Result<Option<ProjectRecord>>;

    /// slug已被占用时返回 `RemoteConflict`
    fn create_project(&self, organization: &OrganizationRecord, new: &NewProject) -> Result<ProjectRecord>;

    fn resource(&self, project: &ProjectRecord, slug: &str) -> Result<Option<ResourceRecord>>;

    /// slug已被占用时返回 `RemoteConflict`
    fn create_resource(&self, project: &ProjectRecord, new: &NewResource) -> Result<ResourceRecord>;

    fn resources<'a>(&'a self, project: &ProjectRecord) -> Listing<'a, ResourceRecord>;

    fn project_languages<'a>(&'a self, project: &ProjectRecord) -> Listing<'a, LanguageRecord>;

    /// 在平台语言目录中查找语言代码
    fn language(&self, code: &str) -> Result<Option<LanguageRecord>>;

    fn add_languages(&self, project: &ProjectRecord, languages: &[LanguageRecord]) -> Result<()>;

    /// 异步上传源字符串，不等待服务端处理完成
    fn upload_strings(&self, resource: &ResourceRecord, content: &str) -> Result<()>;

    /// 请求异步导出翻译，返回下载地址
    fn export_translation(&self, resource: &ResourceRecord, language: &LanguageRecord) -> Result<Url>;

    /// 纯HTTP传输下载地址的内容
    fn fetch(&self, url: &Url) -> Result<RawContent>;
}
