//! Transifex领域客户端
//!
//! `Client` → `Project` → `Resource` 三层句柄，都共享同一个 `TransifexApi`。

// 标准库导入
use std::fmt;
use std::rc::Rc;

// 第三方crate导入
use tracing::{debug, info, warn};

// 本地模块导入
use crate::api_constants::{api_config, get_api_url};
use crate::ci_error;
use crate::encoding::decode_content;
use crate::error::Result;
use crate::http_api::{HttpApiConfig, HttpTransifexApi};
use crate::remote::{
    LanguageRecord, Listing, NewProject, NewResource, OrganizationRecord, ProjectRecord,
    ResourceRecord, TransifexApi,
};

/// 已认证的组织级客户端
pub struct Client {
    api: Rc<dyn TransifexApi>,
    organization: OrganizationRecord,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("organization", &self.organization.slug)
            .finish()
    }
}

impl Client {
    /// 通过给定的API实现解析组织
    ///
    /// 组织不存在时返回 `Authentication` 错误。
    pub fn authenticate(api: Rc<dyn TransifexApi>, organization: &str) -> Result<Self> {
        let record = api
            .organization(organization)
            .map_err(|e| e.for_organization(organization))?
            .ok_or_else(|| ci_error!(auth, organization, "组织不存在或令牌无权访问"))?;

        debug!("已解析组织: {}", record.id);
        Ok(Self {
            api,
            organization: record,
        })
    }

    /// 使用令牌连接Transifex REST API
    pub fn connect(organization: &str, token: &str, api_url: Option<&str>) -> Result<Self> {
        let config = HttpApiConfig {
            base_url: get_api_url(api_url).to_string(),
            ..Default::default()
        };
        let api = HttpTransifexApi::new(token, config)?;
        Self::authenticate(Rc::new(api), organization)
    }

    pub fn organization(&self) -> &str {
        &self.organization.slug
    }

    /// 按slug查找项目，不存在时返回None
    pub fn project(&self, name: &str) -> Result<Option<Project>> {
        let record = self.api.project(&self.organization, name)?;
        Ok(record.map(|record| Project::new(self.api.clone(), record)))
    }

    /// 创建项目，名称与slug都使用 `name`
    pub fn create_project(
        &self,
        name: &str,
        source_language: &str,
        private: bool,
        repository_url: Option<&str>,
    ) -> Result<Project> {
        let language = self.api.language(source_language)?.ok_or_else(|| {
            ci_error!(
                translation,
                format!("未知的源语言: {}", source_language)
            )
        })?;

        let new = NewProject {
            name: name.to_string(),
            slug: name.to_string(),
            source_language: language,
            private,
            repository_url: repository_url.map(str::to_string),
        };

        let record = self.api.create_project(&self.organization, &new)?;
        info!("✅ 已创建项目 {} (源语言: {})", record.slug, source_language);
        Ok(Project::new(self.api.clone(), record))
    }
}

/// 远程项目句柄
pub struct Project {
    api: Rc<dyn TransifexApi>,
    record: ProjectRecord,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project").field("record", &self.record).finish()
    }
}

impl Project {
    fn new(api: Rc<dyn TransifexApi>, record: ProjectRecord) -> Self {
        Self { api, record }
    }

    pub fn slug(&self) -> &str {
        &self.record.slug
    }

    pub fn record(&self) -> &ProjectRecord {
        &self.record
    }

    pub fn resource(&self, slug: &str) -> Result<Option<Resource>> {
        let record = self.api.resource(&self.record, slug)?;
        Ok(record.map(|record| Resource::new(self.api.clone(), record)))
    }

    /// 创建Qt格式的资源，名称与slug都使用 `slug`
    pub fn create_resource(&self, slug: &str) -> Result<Resource> {
        let new = NewResource {
            name: slug.to_string(),
            slug: slug.to_string(),
            i18n_format: api_config::QT_I18N_FORMAT.to_string(),
        };

        let record = self.api.create_resource(&self.record, &new)?;
        info!("✅ 已创建资源 {}", record.slug);
        Ok(Resource::new(self.api.clone(), record))
    }

    /// 项目下的资源，惰性拉取
    pub fn resources(&self) -> Listing<'_, Resource> {
        let api = self.api.clone();
        Box::new(
            self.api
                .resources(&self.record)
                .map(move |record| record.map(|record| Resource::new(api.clone(), record))),
        )
    }

    /// 项目已启用的语言代码，惰性拉取
    pub fn languages(&self) -> Listing<'_, String> {
        Box::new(
            self.api
                .project_languages(&self.record)
                .map(|language| language.map(|l| l.code)),
        )
    }

    /// 为项目添加语言
    ///
    /// 平台目录中不存在的语言代码会被跳过，不视为错误。
    pub fn add_languages(&self, codes: &[&str]) -> Result<()> {
        let mut languages: Vec<LanguageRecord> = Vec::with_capacity(codes.len());
        for code in codes {
            match self.api.language(code)? {
                Some(language) => languages.push(language),
                None => warn!("⚠️  跳过未知语言代码: {}", code),
            }
        }

        if languages.is_empty() {
            return Ok(());
        }

        self.api.add_languages(&self.record, &languages)?;
        info!(
            "🌐 项目 {} 已添加语言: {}",
            self.record.slug,
            languages
                .iter()
                .map(|l| l.code.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(())
    }
}

/// 远程资源句柄
pub struct Resource {
    api: Rc<dyn TransifexApi>,
    record: ResourceRecord,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("record", &self.record).finish()
    }
}

impl Resource {
    fn new(api: Rc<dyn TransifexApi>, record: ResourceRecord) -> Self {
        Self { api, record }
    }

    pub fn slug(&self) -> &str {
        &self.record.slug
    }

    /// 上传源字符串，覆盖资源内容
    pub fn upload_source(&self, content: &str) -> Result<()> {
        self.api.upload_strings(&self.record, content)?;
        debug!("已提交资源 {} 的源字符串 ({} 字节)", self.record.slug, content.len());
        Ok(())
    }

    /// 下载指定语言的翻译内容
    pub fn download(&self, language_code: &str) -> Result<String> {
        let scope = format!("{}/{}", self.record.slug, language_code);
        let language = self
            .api
            .language(language_code)
            .map_err(|e| e.scoped(&scope))?
            .ok_or_else(|| {
                ci_error!(
                    translation,
                    format!("资源 {} 无法下载未知语言 {}", self.record.slug, language_code)
                )
            })?;

        let url = self
            .api
            .export_translation(&self.record, &language)
            .map_err(|e| e.scoped(&scope))?;
        debug!("下载地址 [{}]: {}", scope, url);

        let raw = self.api.fetch(&url).map_err(|e| e.scoped(&scope))?;
        Ok(decode_content(&raw))
    }

    pub fn update(&self, content: &str) -> Result<()> {
        self.upload_source(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::RawContent;
    use crate::error::TransifexCiError;
    use crate::remote::fake::FakeTransifex;

    fn client(fake: &Rc<FakeTransifex>) -> Client {
        Client::authenticate(fake.clone(), "3liz").unwrap()
    }

    #[test]
    fn test_unknown_organization_is_authentication_error() {
        let fake = Rc::new(FakeTransifex::new("3liz"));
        match Client::authenticate(fake, "nobody") {
            Err(TransifexCiError::Authentication { organization, .. }) => {
                assert_eq!(organization.as_deref(), Some("nobody"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_project_lookup_and_creation() {
        let fake = Rc::new(FakeTransifex::new("3liz").with_project("existing", &["fr"]));
        let client = client(&fake);

        assert!(client.project("existing").unwrap().is_some());
        assert!(client.project("missing").unwrap().is_none());

        let project = client
            .create_project("missing", "en", true, Some("https://github.com/3liz/missing"))
            .unwrap();
        assert_eq!(project.slug(), "missing");

        let created = fake.created_projects();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "missing");
        assert_eq!(created[0].slug, "missing");
        assert_eq!(created[0].source_language.code, "en");
        assert!(created[0].private);
        assert_eq!(
            created[0].repository_url.as_deref(),
            Some("https://github.com/3liz/missing")
        );

        assert!(matches!(
            client.create_project("existing", "en", false, None),
            Err(TransifexCiError::RemoteConflict { .. })
        ));
    }

    #[test]
    fn test_create_project_with_unknown_source_language() {
        let fake = Rc::new(FakeTransifex::new("3liz"));
        assert!(matches!(
            client(&fake).create_project("p", "xx_YY", false, None),
            Err(TransifexCiError::Translation { .. })
        ));
        assert!(fake.created_projects().is_empty());
    }

    #[test]
    fn test_create_resource_uses_slug_as_name() {
        let fake = Rc::new(FakeTransifex::new("3liz").with_project("p", &[]));
        let project = client(&fake).project("p").unwrap().unwrap();

        let resource = project.create_resource("my_plugin").unwrap();
        assert_eq!(resource.slug(), "my_plugin");

        let created = fake.created_resources();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].slug, "my_plugin");
        assert_eq!(created[0].name, "my_plugin");
        assert_eq!(created[0].i18n_format, "QT");

        assert!(matches!(
            project.create_resource("my_plugin"),
            Err(TransifexCiError::RemoteConflict { .. })
        ));
    }

    #[test]
    fn test_add_languages_drops_unknown_codes() {
        let fake = Rc::new(FakeTransifex::new("3liz").with_project("p", &[]));
        let project = client(&fake).project("p").unwrap().unwrap();

        project.add_languages(&["fr", "zz_NOPE"]).unwrap();
        assert_eq!(fake.languages_of("p"), vec!["fr".to_string()]);

        let codes: Vec<String> = project.languages().collect::<Result<_>>().unwrap();
        assert_eq!(codes, vec!["fr".to_string()]);
    }

    #[test]
    fn test_resources_listing() {
        let fake = Rc::new(
            FakeTransifex::new("3liz")
                .with_project("p", &[])
                .with_resource("p", "alpha")
                .with_resource("p", "beta"),
        );
        let project = client(&fake).project("p").unwrap().unwrap();

        let slugs: Vec<String> = project
            .resources()
            .map(|r| r.map(|r| r.slug().to_string()))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(slugs, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_download_failure_names_resource_and_language() {
        let fake = Rc::new(
            FakeTransifex::new("3liz")
                .with_project("p", &["fr"])
                .with_resource("p", "res")
                .failing_download("fr"),
        );
        let project = client(&fake).project("p").unwrap().unwrap();
        let resource = project.resource("res").unwrap().unwrap();

        let err = resource.download("fr").unwrap_err();
        assert!(matches!(err, TransifexCiError::RemoteApi { status: 500, .. }));
        assert!(err.to_string().contains("[res/fr]"));
    }

    #[test]
    fn test_download_and_upload() {
        let text = "<translation>Ελληνικά 日本語</translation>";
        let fake = Rc::new(
            FakeTransifex::new("3liz")
                .with_project("p", &["ja"])
                .with_resource("p", "res")
                .with_translation("res", "ja", RawContent::new(text.as_bytes(), None)),
        );
        let project = client(&fake).project("p").unwrap().unwrap();
        let resource = project.resource("res").unwrap().unwrap();

        assert_eq!(resource.download("ja").unwrap(), text);
        assert!(matches!(
            resource.download("zz"),
            Err(TransifexCiError::Translation { .. })
        ));

        resource.update("<TS/>").unwrap();
        assert_eq!(
            fake.uploads(),
            vec![("res".to_string(), "<TS/>".to_string())]
        );
    }
}
