//! Transifex REST API v3 (JSON:API) 的 reqwest 实现
//!
//! 所有请求都是同步阻塞的。API客户端关闭了自动重定向，
//! 以便在轮询导出任务时拿到 303 响应里的下载地址；
//! 下载本身使用不带认证头的普通客户端。

// 标准库导入
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::thread;
use std::time::Duration;

// 第三方crate导入
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

// 本地模块导入
use crate::api_constants::{api_config, download_config, is_valid_api_url};
use crate::ci_error;
use crate::encoding::RawContent;
use crate::error::{Result, TransifexCiError};
use crate::remote::{
    LanguageRecord, Listing, NewProject, NewResource, OrganizationRecord, ProjectRecord,
    ResourceRecord, TransifexApi,
};

/// HTTP客户端配置
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// API根地址
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout: u64,
    /// 导出轮询间隔
    pub poll_interval: Duration,
    /// 最大轮询次数
    pub max_polls: usize,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            base_url: api_config::DEFAULT_API_URL.to_string(),
            timeout: api_config::REQUEST_TIMEOUT_SECONDS,
            poll_interval: Duration::from_millis(download_config::POLL_INTERVAL_MS),
            max_polls: download_config::MAX_POLL_ATTEMPTS,
        }
    }
}

/// JSON:API 文档
#[derive(Debug, Deserialize)]
struct Document<T> {
    data: T,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    next: Option<String>,
}

/// JSON:API 资源对象
#[derive(Debug, Deserialize)]
struct ApiObject<A> {
    id: String,
    attributes: A,
    #[serde(default)]
    relationships: Value,
}

#[derive(Debug, Deserialize)]
struct OrganizationAttributes {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct ProjectAttributes {
    slug: String,
    name: String,
    #[serde(default)]
    private: bool,
    repository_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceAttributes {
    slug: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct LanguageAttributes {
    code: String,
}

#[derive(Debug, Deserialize)]
struct ExportAttributes {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Value,
}

fn related_id(relationships: &Value, name: &str) -> Option<String> {
    relationships
        .get(name)
        .and_then(|r| r.get("data"))
        .and_then(|d| d.get("id"))
        .and_then(|id| id.as_str())
        .map(str::to_string)
}

fn to_organization(obj: ApiObject<OrganizationAttributes>) -> OrganizationRecord {
    OrganizationRecord {
        id: obj.id,
        slug: obj.attributes.slug,
    }
}

fn to_project(obj: ApiObject<ProjectAttributes>) -> ProjectRecord {
    let source_language = related_id(&obj.relationships, "source_language")
        .map(|id| id.trim_start_matches("l:").to_string());
    ProjectRecord {
        id: obj.id,
        slug: obj.attributes.slug,
        name: obj.attributes.name,
        source_language,
        private: obj.attributes.private,
        repository_url: obj.attributes.repository_url,
    }
}

fn to_resource(obj: ApiObject<ResourceAttributes>) -> ResourceRecord {
    let i18n_format = related_id(&obj.relationships, "i18n_format");
    ResourceRecord {
        id: obj.id,
        slug: obj.attributes.slug,
        name: obj.attributes.name,
        i18n_format,
    }
}

fn to_language(obj: ApiObject<LanguageAttributes>) -> LanguageRecord {
    LanguageRecord {
        id: obj.id,
        code: obj.attributes.code,
    }
}

fn relation(kind: &str, id: &str) -> Value {
    json!({ "data": { "type": kind, "id": id } })
}

/// 从JSON:API错误响应中提取可读消息
fn error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        if let Some(err) = v.get("errors").and_then(|e| e.get(0)) {
            let detail = err
                .get("detail")
                .or_else(|| err.get("title"))
                .and_then(|d| d.as_str());
            if let Some(detail) = detail {
                return detail.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() > 400 {
        format!("{}...", trimmed.chars().take(400).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

/// Transifex REST API 客户端
pub struct HttpTransifexApi {
    /// 带认证头的API客户端
    client: Client,
    /// 下载导出文件用的普通客户端
    transfer: Client,
    base_url: Url,
    poll_interval: Duration,
    max_polls: usize,
}

impl HttpTransifexApi {
    /// 使用令牌创建客户端
    pub fn new(token: &str, config: HttpApiConfig) -> Result<Self> {
        if !is_valid_api_url(&config.base_url) {
            return Err(ci_error!(config, "api_url", format!("无效的API地址: {}", config.base_url)));
        }
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ci_error!(config, "api_url", e))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ci_error!(config, "transifex_token", "令牌包含非法字符"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(api_config::JSON_API_MEDIA_TYPE),
        );
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(api_config::JSON_API_MEDIA_TYPE),
        );

        let client = Client::builder()
            .user_agent(api_config::USER_AGENT)
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        let transfer = Client::builder()
            .user_agent(api_config::USER_AGENT)
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            transfer,
            base_url,
            poll_interval: config.poll_interval,
            max_polls: config.max_polls,
        })
    }

    /// 构造POST请求，Content-Type 由默认请求头提供
    fn post(&self, url: &Url, body: &Value) -> RequestBuilder {
        self.client.post(url.clone()).body(body.to_string())
    }

    /// 拼接API路径
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ci_error!(config, "api_url", "API地址不能作为基础路径"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// 发送请求并检查状态码
    ///
    /// 401/403 视为认证失败；其余非成功状态转换为 `RemoteApi`。
    fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response> {
        debug!("请求 {}", url);
        let response = request.send()?;
        let status = response.status();

        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = error_message(&body);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(TransifexCiError::Authentication {
                    organization: None,
                    reason: format!("{} ({})", message, url),
                })
            }
            _ => Err(ci_error!(remote_api, status.as_u16(), message, url)),
        }
    }

    /// GET一个JSON:API文档，404时返回None
    fn get_document<T: DeserializeOwned>(&self, url: Url) -> Result<Option<Document<T>>> {
        match self.send(self.client.get(url.clone()), &url) {
            Ok(response) => Ok(Some(response.json::<Document<T>>()?)),
            Err(TransifexCiError::RemoteApi { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 按过滤条件查询，取第一条
    fn find_first<A: DeserializeOwned>(
        &self,
        segments: &[&str],
        filters: &[(&str, &str)],
    ) -> Result<Option<ApiObject<A>>> {
        let mut url = self.endpoint(segments)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in filters {
                query.append_pair(&format!("filter[{}]", key), value);
            }
        }

        let document = self.get_document::<Vec<ApiObject<A>>>(url)?;
        Ok(document.and_then(|d| d.data.into_iter().next()))
    }

    /// 创建对象，409时转换为 `RemoteConflict`
    fn create<A: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: Value,
        kind: &str,
        slug: &str,
    ) -> Result<ApiObject<A>> {
        let url = self.endpoint(segments)?;
        match self.send(self.post(&url, &body), &url) {
            Ok(response) => Ok(response.json::<Document<ApiObject<A>>>()?.data),
            Err(TransifexCiError::RemoteApi { status: 409, .. }) => {
                Err(ci_error!(conflict, kind, slug))
            }
            Err(e) => Err(e),
        }
    }

    fn paginate<'a, A, T>(&'a self, url: Result<Url>, convert: fn(ApiObject<A>) -> T) -> Listing<'a, T>
    where
        A: DeserializeOwned + 'a,
        T: 'a,
    {
        match url {
            Ok(url) => Box::new(Pages {
                api: self,
                next: Some(url),
                buffer: VecDeque::new(),
                convert,
                _attributes: PhantomData,
            }),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    /// 轮询导出任务直到拿到下载地址
    fn wait_for_download(&self, status_url: Url) -> Result<Url> {
        for attempt in 1..=self.max_polls {
            let response = self.send(self.client.get(status_url.clone()), &status_url)?;

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        ci_error!(
                            remote_api,
                            response.status().as_u16(),
                            "导出完成但缺少下载地址",
                            status_url
                        )
                    })?;
                return status_url
                    .join(location)
                    .map_err(|e| ci_error!(remote_api, response.status().as_u16(), e, status_url));
            }

            let document = response.json::<Document<ApiObject<ExportAttributes>>>()?;
            let attributes = document.data.attributes;
            if attributes.status.as_deref() == Some("failed") {
                return Err(ci_error!(
                    remote_api,
                    200,
                    format!("导出任务失败: {}", attributes.errors),
                    status_url
                ));
            }

            debug!(
                "导出任务处理中 ({}/{}): {:?}",
                attempt, self.max_polls, attributes.status
            );
            thread::sleep(self.poll_interval);
        }

        Err(ci_error!(
            remote_api,
            408,
            format!("导出任务在 {} 次轮询后仍未完成", self.max_polls),
            status_url
        ))
    }
}

/// 按 `links.next` 逐页拉取的惰性迭代器
struct Pages<'a, A, T> {
    api: &'a HttpTransifexApi,
    next: Option<Url>,
    buffer: VecDeque<T>,
    convert: fn(ApiObject<A>) -> T,
    _attributes: PhantomData<A>,
}

impl<'a, A: DeserializeOwned, T> Iterator for Pages<'a, A, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }

            let url = self.next.take()?;
            let page = match self.api.get_document::<Vec<ApiObject<A>>>(url.clone()) {
                Ok(Some(page)) => page,
                Ok(None) => return Some(Err(ci_error!(remote_api, 404, "列表不存在", url))),
                Err(e) => return Some(Err(e)),
            };

            if let Some(next) = page.links.next {
                match Url::parse(&next) {
                    Ok(next) => self.next = Some(next),
                    Err(e) => return Some(Err(ci_error!(remote_api, 200, e, url))),
                }
            }

            self.buffer.extend(page.data.into_iter().map(self.convert));
        }
    }
}

impl TransifexApi for HttpTransifexApi {
    fn organization(&self, slug: &str) -> Result<Option<OrganizationRecord>> {
        let found = self.find_first::<OrganizationAttributes>(&["organizations"], &[("slug", slug)])?;
        Ok(found.map(to_organization))
    }

    fn project(&self, organization: &OrganizationRecord, slug: &str) -> Result<Option<ProjectRecord>> {
        let found = self.find_first::<ProjectAttributes>(
            &["projects"],
            &[("organization", organization.id.as_str()), ("slug", slug)],
        )?;
        Ok(found.map(to_project))
    }

    fn create_project(&self, organization: &OrganizationRecord, new: &NewProject) -> Result<ProjectRecord> {
        let mut attributes = json!({
            "name": new.name,
            "slug": new.slug,
            "private": new.private,
        });
        if let Some(url) = &new.repository_url {
            attributes["repository_url"] = json!(url);
        }

        let body = json!({
            "data": {
                "type": "projects",
                "attributes": attributes,
                "relationships": {
                    "organization": relation("organizations", &organization.id),
                    "source_language": relation("languages", &new.source_language.id),
                }
            }
        });

        info!("🆕 创建Transifex项目: {}", new.slug);
        self.create::<ProjectAttributes>(&["projects"], body, "项目", &new.slug)
            .map(to_project)
    }

    fn resource(&self, project: &ProjectRecord, slug: &str) -> Result<Option<ResourceRecord>> {
        let found = self.find_first::<ResourceAttributes>(
            &["resources"],
            &[("project", project.id.as_str()), ("slug", slug)],
        )?;
        Ok(found.map(to_resource))
    }

    fn create_resource(&self, project: &ProjectRecord, new: &NewResource) -> Result<ResourceRecord> {
        let body = json!({
            "data": {
                "type": "resources",
                "attributes": {
                    "name": new.name,
                    "slug": new.slug,
                },
                "relationships": {
                    "project": relation("projects", &project.id),
                    "i18n_format": relation("i18n_formats", &new.i18n_format),
                }
            }
        });

        info!("🆕 创建Transifex资源: {}", new.slug);
        self.create::<ResourceAttributes>(&["resources"], body, "资源", &new.slug)
            .map(to_resource)
    }

    fn resources<'a>(&'a self, project: &ProjectRecord) -> Listing<'a, ResourceRecord> {
        let url = self.endpoint(&["resources"]).map(|mut url| {
            url.query_pairs_mut().append_pair("filter[project]", &project.id);
            url
        });
        self.paginate(url, to_resource)
    }

    fn project_languages<'a>(&'a self, project: &ProjectRecord) -> Listing<'a, LanguageRecord> {
        let url = self.endpoint(&["projects", &project.id, "languages"]);
        self.paginate(url, to_language)
    }

    fn language(&self, code: &str) -> Result<Option<LanguageRecord>> {
        let url = self.endpoint(&["languages", &format!("l:{}", code)])?;
        let document = self.get_document::<ApiObject<LanguageAttributes>>(url)?;
        Ok(document.map(|d| to_language(d.data)))
    }

    fn add_languages(&self, project: &ProjectRecord, languages: &[LanguageRecord]) -> Result<()> {
        if languages.is_empty() {
            return Ok(());
        }

        let data: Vec<Value> = languages
            .iter()
            .map(|l| json!({ "type": "languages", "id": l.id }))
            .collect();

        let url = self.endpoint(&["projects", &project.id, "relationships", "languages"])?;
        self.send(self.post(&url, &json!({ "data": data })), &url)?;
        Ok(())
    }

    fn upload_strings(&self, resource: &ResourceRecord, content: &str) -> Result<()> {
        let body = json!({
            "data": {
                "type": "resource_strings_async_uploads",
                "attributes": {
                    "content": content,
                    "content_encoding": "text",
                },
                "relationships": {
                    "resource": relation("resources", &resource.id),
                }
            }
        });

        let url = self.endpoint(&["resource_strings_async_uploads"])?;
        let response = self.send(self.post(&url, &body), &url)?;
        match response.json::<Value>() {
            Ok(upload) => debug!(
                "上传任务已提交: {}",
                upload
                    .get("data")
                    .and_then(|d| d.get("id"))
                    .and_then(|id| id.as_str())
                    .unwrap_or("?")
            ),
            Err(e) => warn!("⚠️  上传任务已提交，但响应无法解析: {}", e),
        }
        Ok(())
    }

    fn export_translation(&self, resource: &ResourceRecord, language: &LanguageRecord) -> Result<Url> {
        let body = json!({
            "data": {
                "type": "resource_translations_async_downloads",
                "attributes": {
                    "content_encoding": "text",
                    "file_type": "default",
                    "mode": "default",
                },
                "relationships": {
                    "resource": relation("resources", &resource.id),
                    "language": relation("languages", &language.id),
                }
            }
        });

        let url = self.endpoint(&["resource_translations_async_downloads"])?;
        let response = self.send(self.post(&url, &body), &url)?;
        let job = response.json::<Document<ApiObject<ExportAttributes>>>()?.data;

        let status_url = self.endpoint(&["resource_translations_async_downloads", &job.id])?;
        self.wait_for_download(status_url)
    }

    fn fetch(&self, url: &Url) -> Result<RawContent> {
        let response = self.transfer.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ci_error!(remote_api, status.as_u16(), "下载翻译文件失败", url));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes()?;

        Ok(RawContent {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
