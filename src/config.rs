//! 配置管理模块
//!
//! 提供CLI参数解析、配置文件发现与运行参数管理功能

// 标准库导入
use std::fs;
use std::path::{Path, PathBuf};

// 第三方crate导入
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::debug;

// 本地模块导入
use crate::api_constants::project_config;
use crate::ci_error;
use crate::error::{Result, TransifexCiError};
use crate::utils::{find_in_path, local_translation_path, resolve_tool};

/// 单次运行的参数
///
/// 由配置文件构建一次，整个运行期间只读。支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use qgis_transifex_ci::config::RunParameters;
///
/// let params = RunParameters::new("my_plugin", "3liz-1", "my-plugin")
///     .with_resource("my_plugin")
///     .with_source_lang("fr");
/// assert_eq!(params.resource(), "my_plugin");
/// ```
#[derive(Debug, Clone)]
pub struct RunParameters {
    /// 插件根目录
    plugin_path: PathBuf,
    /// Transifex组织slug
    organization: String,
    /// Transifex项目slug
    project: String,
    /// 资源slug
    resource: String,
    /// 源语言代码
    source_lang: String,
    /// 新建项目是否私有
    private: bool,
    /// 新建项目的源码仓库地址
    repository_url: Option<String>,
    /// 翻译编译工具
    lrelease_executable: PathBuf,
    /// 字符串提取工具
    pylupdate5_executable: PathBuf,
}

impl RunParameters {
    /// 创建新的参数实例
    ///
    /// 资源名默认与项目名相同，源语言默认为英语，外部工具使用程序名。
    pub fn new(
        plugin_path: impl Into<PathBuf>,
        organization: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        let project = project.into();
        Self {
            plugin_path: plugin_path.into(),
            organization: organization.into(),
            resource: project.clone(),
            project,
            source_lang: project_config::DEFAULT_SOURCE_LANG.to_string(),
            private: false,
            repository_url: None,
            lrelease_executable: PathBuf::from(project_config::LRELEASE),
            pylupdate5_executable: PathBuf::from(project_config::PYLUPDATE5),
        }
    }

    pub fn plugin_path(&self) -> &Path {
        &self.plugin_path
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    pub fn lrelease_executable(&self) -> &Path {
        &self.lrelease_executable
    }

    pub fn pylupdate5_executable(&self) -> &Path {
        &self.pylupdate5_executable
    }

    /// 源语言翻译文件路径
    pub fn translation_file_path(&self) -> PathBuf {
        local_translation_path(&self.plugin_path, &self.resource, &self.source_lang)
    }

    /// 生成的Qt项目清单路径: <plugin_root>/<project>.pro
    pub fn project_file_path(&self) -> PathBuf {
        self.plugin_path.join(format!("{}.pro", self.project))
    }

    /// 设置资源slug
    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = resource.to_string();
        self
    }

    /// 设置源语言代码
    pub fn with_source_lang(mut self, lang: &str) -> Self {
        self.source_lang = lang.to_string();
        self
    }

    /// 设置新建项目是否私有
    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// 设置新建项目的仓库地址
    pub fn with_repository_url(mut self, url: Option<&str>) -> Self {
        self.repository_url = url.map(str::to_string);
        self
    }

    /// 设置翻译编译工具路径
    pub fn with_lrelease(mut self, path: impl Into<PathBuf>) -> Self {
        self.lrelease_executable = path.into();
        self
    }

    /// 设置字符串提取工具路径
    pub fn with_pylupdate5(mut self, path: impl Into<PathBuf>) -> Self {
        self.pylupdate5_executable = path.into();
        self
    }

    /// 由配置文件内容构建运行参数
    ///
    /// 相对路径以配置文件所在目录为基准。
    pub fn from_config(config: ConfigFile, base_dir: &Path) -> Result<Self> {
        let organization = required(config.organization, "organization")?;
        let project = required(config.project, "project")?;

        let plugin_path = config
            .plugin_path
            .unwrap_or_else(|| PathBuf::from(&project));
        let plugin_path = base_dir.join(plugin_path);

        let mut params = RunParameters::new(plugin_path, organization, project)
            .with_private(config.private.unwrap_or(false))
            .with_repository_url(non_empty(config.repository_url.as_deref()));

        if let Some(resource) = non_empty(config.resource.as_deref()) {
            params = params.with_resource(resource);
        }
        if let Some(lang) = non_empty(config.source_lang.as_deref()) {
            params = params.with_source_lang(lang);
        }

        params.lrelease_executable =
            resolve_executable(config.lrelease, project_config::LRELEASE, base_dir)?;
        params.pylupdate5_executable =
            resolve_executable(config.pylupdate5, project_config::PYLUPDATE5, base_dir)?;

        Ok(params)
    }
}

/// 配置文件内容
///
/// 可以是 `.qgis-transifex-ci.toml` 的顶层表，
/// 也可以是 `pyproject.toml` 中的 `[tool.qgis-plugin-transifex-ci]` 表。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub organization: Option<String>,
    pub project: Option<String>,
    pub resource: Option<String>,
    #[serde(alias = "source-lang", alias = "source_language")]
    pub source_lang: Option<String>,
    #[serde(alias = "plugin-path")]
    pub plugin_path: Option<PathBuf>,
    pub private: Option<bool>,
    #[serde(alias = "repository-url")]
    pub repository_url: Option<String>,
    pub lrelease: Option<PathBuf>,
    pub pylupdate5: Option<PathBuf>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match non_empty(value.as_deref()) {
        Some(v) => Ok(v.to_string()),
        None => Err(ci_error!(config, field, "缺少必填配置项")),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn resolve_executable(configured: Option<PathBuf>, default: &str, base_dir: &Path) -> Result<PathBuf> {
    let Some(configured) = configured else {
        return Ok(resolve_tool(default));
    };

    // 单一程序名按PATH查找，其余按路径处理
    if configured.components().count() == 1 && !configured.is_absolute() {
        let name = configured.to_string_lossy();
        return find_in_path(&name)
            .ok_or_else(|| ci_error!(config, default, format!("PATH中找不到可执行文件 {}", name)));
    }

    let path = base_dir.join(&configured);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ci_error!(
            config,
            default,
            format!("可执行文件不存在: {}", path.display())
        ))
    }
}

/// 在目录中查找配置文件
///
/// 优先使用包含工具配置段的 `pyproject.toml`，其次是 `.qgis-transifex-ci.toml`。
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    let pyproject = dir.join(project_config::PYPROJECT_FILE_NAME);
    if pyproject.is_file() && pyproject_section(&pyproject).ok().flatten().is_some() {
        return Some(pyproject);
    }

    let dedicated = dir.join(project_config::CONFIG_FILE_NAME);
    if dedicated.is_file() {
        return Some(dedicated);
    }

    None
}

fn parse_toml(path: &Path) -> Result<toml::Table> {
    let content =
        fs::read_to_string(path).map_err(|e| TransifexCiError::file_op(path, "读取", e))?;
    content
        .parse::<toml::Table>()
        .map_err(|e| ci_error!(config, path.display(), format!("TOML解析失败: {}", e)))
}

fn pyproject_section(path: &Path) -> Result<Option<toml::Table>> {
    let mut table = parse_toml(path)?;
    let section = match table.remove("tool") {
        Some(toml::Value::Table(mut tool)) => tool.remove(project_config::PYPROJECT_SECTION),
        _ => None,
    };
    match section {
        Some(toml::Value::Table(section)) => Ok(Some(section)),
        Some(_) => Err(ci_error!(
            config,
            project_config::PYPROJECT_SECTION,
            "配置段必须是表"
        )),
        None => Ok(None),
    }
}

/// 读取配置文件
pub fn read_config_from_file(path: &Path) -> Result<ConfigFile> {
    let is_pyproject = path
        .file_name()
        .map(|name| name == project_config::PYPROJECT_FILE_NAME)
        .unwrap_or(false);

    let table = if is_pyproject {
        pyproject_section(path)?.ok_or_else(|| {
            ci_error!(
                config,
                path.display(),
                format!("缺少 [tool.{}] 配置段", project_config::PYPROJECT_SECTION)
            )
        })?
    } else {
        parse_toml(path)?
    };

    toml::Value::Table(table)
        .try_into::<ConfigFile>()
        .map_err(|e| ci_error!(config, path.display(), e))
}

/// 加载运行参数
///
/// `path` 可以是配置文件本身，也可以是包含配置文件的目录。
pub fn load_parameters(path: &Path) -> Result<RunParameters> {
    let config_path = if path.is_dir() {
        find_config_file(path).ok_or_else(|| {
            ci_error!(
                config,
                path.display(),
                format!(
                    "找不到配置文件 ({} 或 {})",
                    project_config::PYPROJECT_FILE_NAME,
                    project_config::CONFIG_FILE_NAME
                )
            )
        })?
    } else {
        path.to_path_buf()
    };

    debug!("读取配置文件: {}", config_path.display());
    let config = read_config_from_file(&config_path)?;

    let base_dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    RunParameters::from_config(config, &base_dir)
}

/// CLI参数结构
#[derive(Parser)]
#[command(author, version, about = "QGIS插件翻译同步工具 - 在CI中对接Transifex平台", long_about = None)]
pub struct Cli {
    /// 配置文件路径或所在目录
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub config: PathBuf,

    /// Transifex API令牌
    #[arg(long, env = project_config::TOKEN_ENV, hide_env_values = true)]
    pub transifex_token: Option<String>,

    /// Transifex API地址
    #[arg(long, env = project_config::API_URL_ENV)]
    pub api_url: Option<String>,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// 获取Transifex令牌
    pub fn token(&self) -> Result<&str> {
        match non_empty(self.transifex_token.as_deref()) {
            Some(token) => Ok(token),
            None => Err(ci_error!(
                config,
                project_config::TOKEN_ENV,
                "需要 --transifex-token 或环境变量"
            )),
        }
    }
}

/// 子命令
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 从Transifex拉取翻译文件
    Pull {
        /// 只拉取指定语言 (逗号分隔)
        #[arg(short, long, value_delimiter = ',')]
        languages: Vec<String>,
    },
    /// 推送源语言翻译文件
    Push,
    /// 从插件源码更新翻译源文件
    #[command(alias = "ts")]
    UpdateStrings,
    /// 编译翻译文件
    #[command(alias = "qm")]
    CompileStrings,
    /// 列出项目已启用的语言
    Languages,
    /// 为项目添加语言
    AddLanguages {
        /// 语言代码
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// 列出项目资源
    Resources,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const DEDICATED: &str = r#"
organization = "3liz-1"
project = "my-plugin"
plugin_path = "my_plugin"
lrelease = "bin/lrelease"
"#;

    const PYPROJECT: &str = r#"
[project]
name = "my-plugin"

[tool.qgis-plugin-transifex-ci]
organization = "3liz-1"
project = "py-plugin"
resource = "py_plugin"
source_lang = "fr"
private = true
repository_url = "https://github.com/3liz/py-plugin"
"#;

    #[test]
    fn test_find_config_file_prefers_pyproject() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".qgis-transifex-ci.toml", DEDICATED);
        write(dir.path(), "pyproject.toml", PYPROJECT);

        let path = find_config_file(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "pyproject.toml");
    }

    #[test]
    fn test_find_config_file_ignores_unrelated_pyproject() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pyproject.toml", "[project]\nname = \"x\"\n");
        assert!(find_config_file(dir.path()).is_none());

        write(dir.path(), ".qgis-transifex-ci.toml", DEDICATED);
        let path = find_config_file(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), ".qgis-transifex-ci.toml");
    }

    #[test]
    fn test_read_config() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), ".qgis-transifex-ci.toml", DEDICATED);
        let config = read_config_from_file(&path).unwrap();
        assert_eq!(config.organization.as_deref(), Some("3liz-1"));
        assert_eq!(config.project.as_deref(), Some("my-plugin"));
        assert!(config.resource.is_none());
    }

    #[test]
    fn test_load_parameters_from_dedicated_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        write(&dir.path().join("bin"), "lrelease", "#!/bin/sh\n");
        write(dir.path(), ".qgis-transifex-ci.toml", DEDICATED);

        let params = load_parameters(dir.path()).unwrap();
        assert_eq!(params.plugin_path().parent(), Some(dir.path()));
        assert!(params.lrelease_executable().exists());
        assert_eq!(params.organization(), "3liz-1");
        assert_eq!(params.resource(), "my-plugin");
        assert_eq!(params.source_lang(), "en");
        assert!(!params.is_private());
        assert_eq!(
            params.translation_file_path(),
            dir.path().join("my_plugin").join("i18n").join("my-plugin_en.ts")
        );
        assert_eq!(
            params.project_file_path(),
            dir.path().join("my_plugin").join("my-plugin.pro")
        );
    }

    #[test]
    fn test_load_parameters_from_pyproject() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "pyproject.toml", PYPROJECT);

        let params = load_parameters(&path).unwrap();
        assert_eq!(params.project(), "py-plugin");
        assert_eq!(params.resource(), "py_plugin");
        assert_eq!(params.source_lang(), "fr");
        assert!(params.is_private());
        assert_eq!(
            params.repository_url(),
            Some("https://github.com/3liz/py-plugin")
        );
        // 未配置plugin_path时使用项目名
        assert_eq!(params.plugin_path(), dir.path().join("py-plugin"));
    }

    #[test]
    fn test_missing_required_key() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".qgis-transifex-ci.toml", "project = \"p\"\n");

        match load_parameters(dir.path()) {
            Err(TransifexCiError::Configuration { field, .. }) => {
                assert_eq!(field, "organization")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_explicit_executable() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            ".qgis-transifex-ci.toml",
            "organization = \"o\"\nproject = \"p\"\npylupdate5 = \"tools/pylupdate5\"\n",
        );

        match load_parameters(dir.path()) {
            Err(TransifexCiError::Configuration { field, reason }) => {
                assert_eq!(field, "pylupdate5");
                assert!(reason.contains("tools"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_no_config_in_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_parameters(dir.path()),
            Err(TransifexCiError::Configuration { .. })
        ));
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "qgis-plugin-transifex-ci",
            "--transifex-token",
            "secret",
            "pull",
            "--languages",
            "fr,de",
        ])
        .unwrap();
        assert_eq!(cli.token().unwrap(), "secret");
        assert_eq!(
            cli.command,
            Command::Pull {
                languages: vec!["fr".to_string(), "de".to_string()]
            }
        );

        let cli = Cli::try_parse_from(["qgis-plugin-transifex-ci", "ts"]).unwrap();
        assert_eq!(cli.command, Command::UpdateStrings);

        let cli = Cli::try_parse_from(["qgis-plugin-transifex-ci", "qm", "-v"]).unwrap();
        assert_eq!(cli.command, Command::CompileStrings);
        assert!(cli.verbose);
    }
}
