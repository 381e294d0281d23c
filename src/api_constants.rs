/// Transifex API配置常量
///
/// 该文件定义了所有远程服务、下载轮询以及插件项目相关的常量配置，方便统一管理和维护

/// 默认Transifex API配置
pub mod api_config {
    /// Transifex REST API v3 地址
    pub const DEFAULT_API_URL: &str = "https://rest.api.transifex.com";

    /// JSON:API 媒体类型
    pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

    /// Qt翻译源文件格式标识
    pub const QT_I18N_FORMAT: &str = "QT";

    /// 请求超时时间（秒）
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;

    /// 默认User-Agent
    pub const USER_AGENT: &str = concat!("qgis-plugin-transifex-ci/", env!("CARGO_PKG_VERSION"));
}

/// 异步导出下载配置
pub mod download_config {
    /// 轮询间隔（毫秒）
    pub const POLL_INTERVAL_MS: u64 = 2000;

    /// 最大轮询次数
    pub const MAX_POLL_ATTEMPTS: usize = 90;
}

/// 插件项目配置
pub mod project_config {
    /// 专用配置文件名
    pub const CONFIG_FILE_NAME: &str = ".qgis-transifex-ci.toml";

    /// Python项目清单文件名
    pub const PYPROJECT_FILE_NAME: &str = "pyproject.toml";

    /// pyproject.toml中 [tool.<section>] 的名称
    pub const PYPROJECT_SECTION: &str = "qgis-plugin-transifex-ci";

    /// 默认源语言
    pub const DEFAULT_SOURCE_LANG: &str = "en";

    /// 翻译文件目录名
    pub const I18N_DIR: &str = "i18n";

    /// 翻译源文件扩展名
    pub const TS_EXTENSION: &str = "ts";

    /// 字符串提取工具
    pub const PYLUPDATE5: &str = "pylupdate5";

    /// 翻译编译工具
    pub const LRELEASE: &str = "lrelease";

    /// Transifex令牌环境变量
    pub const TOKEN_ENV: &str = "TX_TOKEN";

    /// API地址环境变量
    pub const API_URL_ENV: &str = "TRANSIFEX_API_URL";
}

/// 实用工具函数
/// 获取API URL，优先使用自定义地址
pub fn get_api_url(custom_api: Option<&str>) -> &str {
    match custom_api {
        Some(custom) if !custom.trim().is_empty() => custom,
        _ => api_config::DEFAULT_API_URL,
    }
}

/// 验证API URL是否有效
pub fn is_valid_api_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_selection() {
        assert_eq!(get_api_url(None), api_config::DEFAULT_API_URL);
        assert_eq!(get_api_url(Some("  ")), api_config::DEFAULT_API_URL);
        assert_eq!(get_api_url(Some("http://localhost:8080")), "http://localhost:8080");
    }

    #[test]
    fn test_api_url_validation() {
        assert!(is_valid_api_url("https://rest.api.transifex.com"));
        assert!(is_valid_api_url("http://localhost:8080"));
        assert!(!is_valid_api_url("ftp://example.com"));
        assert!(!is_valid_api_url("invalid-url"));
    }
}
