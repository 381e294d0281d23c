//! 翻译同步流程
//!
//! 负责在插件目录与Transifex项目之间推送源字符串、拉取翻译，
//! 以及调用Qt工具链提取和编译翻译文件。

// 标准库导入
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

// 第三方crate导入
use tracing::{debug, info, warn};

// 本地模块导入
use crate::api_constants::project_config;
use crate::ci_error;
use crate::client::{Client, Project, Resource};
use crate::config::RunParameters;
use crate::error::{Result, TransifexCiError};
use crate::manifest::ProjectManifest;
use crate::runner::{run_checked, CommandRunner};
use crate::utils::{i18n_dir, local_translation_path};

/// 绑定到一个Transifex项目的翻译流程
#[derive(Debug)]
pub struct Translation {
    params: RunParameters,
    project: Project,
}

impl Translation {
    /// 连接Transifex并解析项目，项目不存在时自动创建
    pub fn new(params: RunParameters, token: &str, api_url: Option<&str>) -> Result<Self> {
        let client = Client::connect(params.organization(), token, api_url)?;
        Self::with_client(params, &client)
    }

    /// 使用已认证的客户端解析项目
    pub fn with_client(params: RunParameters, client: &Client) -> Result<Self> {
        let project = match client.project(params.project())? {
            Some(project) => project,
            None => {
                info!(
                    "🆕 项目 {} 不存在，使用源语言 {} 创建",
                    params.project(),
                    params.source_lang()
                );
                client.create_project(
                    params.project(),
                    params.source_lang(),
                    params.is_private(),
                    params.repository_url(),
                )?
            }
        };

        Ok(Self { params, project })
    }

    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// 拉取翻译文件
    ///
    /// `selected_languages` 为空时拉取项目的全部语言，否则只拉取交集。
    /// 语言按字典序依次下载，遇到失败立即返回，已写入的文件保留。
    pub fn pull(&self, selected_languages: &[String]) -> Result<Vec<PathBuf>> {
        let resource_slug = self.params.resource();
        let resource = self.project.resource(resource_slug)?.ok_or_else(|| {
            ci_error!(
                translation,
                format!("资源 {} 不存在", resource_slug)
            )
        })?;

        let mut languages = self
            .project
            .languages()
            .collect::<Result<BTreeSet<String>>>()?;
        info!(
            "🌐 资源 '{}' 共有 {} 种语言",
            resource_slug,
            languages.len()
        );

        if !selected_languages.is_empty() {
            languages.retain(|lang| selected_languages.contains(lang));
        }

        let dir = i18n_dir(self.params.plugin_path());
        fs::create_dir_all(&dir).map_err(|e| TransifexCiError::file_op(&dir, "创建", e))?;

        let mut written = Vec::with_capacity(languages.len());
        for lang in &languages {
            let path = local_translation_path(self.params.plugin_path(), resource_slug, lang);
            info!("📥 下载翻译文件: {}", path.display());
            self.download_to(&resource, lang, &path)?;
            written.push(path);
        }

        Ok(written)
    }

    fn download_to(&self, resource: &Resource, lang: &str, path: &Path) -> Result<()> {
        let content = resource.download(lang)?;
        fs::write(path, content).map_err(|e| TransifexCiError::file_op(path, "写入", e))
    }

    /// 推送源语言翻译文件，资源不存在时先创建
    pub fn push(&self) -> Result<()> {
        let ts_path = self.params.translation_file_path();
        let content = fs::read_to_string(&ts_path)
            .map_err(|e| TransifexCiError::file_op(&ts_path, "读取", e))?;

        let resource_slug = self.params.resource();
        let resource = match self.project.resource(resource_slug)? {
            Some(resource) => resource,
            None => self.project.create_resource(resource_slug)?,
        };

        info!(
            "📤 推送资源 {} ← '{}'",
            resource_slug,
            ts_path.display()
        );
        resource.update(&content)
    }

    /// 从插件源码更新翻译源文件
    ///
    /// 先生成 `.pro` 清单，再运行 `pylupdate5 -noobsolete <清单>`。
    pub fn update_strings(params: &RunParameters, runner: &dyn CommandRunner) -> Result<PathBuf> {
        let plugin_path = params.plugin_path();
        let ts_path = params.translation_file_path();

        let manifest = ProjectManifest::scan(plugin_path, &ts_path)?;
        let project_file = manifest.write(&params.project_file_path())?;

        let args: Vec<OsString> = vec!["-noobsolete".into(), project_file.clone().into_os_string()];
        run_checked(runner, params.pylupdate5_executable(), &args)?;

        info!("✅ 翻译源文件已更新: {}", ts_path.display());
        Ok(ts_path)
    }

    /// 将 `i18n/*.ts` 编译为 `.qm`
    pub fn compile_strings(params: &RunParameters, runner: &dyn CommandRunner) -> Result<Vec<PathBuf>> {
        let ts_files = translation_sources(&i18n_dir(params.plugin_path()))?;

        if ts_files.is_empty() {
            warn!(
                "⚠️  {} 中没有翻译文件，跳过编译",
                i18n_dir(params.plugin_path()).display()
            );
            return Ok(ts_files);
        }

        let args: Vec<OsString> = ts_files.iter().map(|p| p.clone().into_os_string()).collect();
        run_checked(runner, params.lrelease_executable(), &args)?;

        info!("✅ 已编译 {} 个翻译文件", ts_files.len());
        Ok(ts_files)
    }
}

/// i18n目录下的 `.ts` 文件，按路径排序
fn translation_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!("翻译目录不存在: {}", dir.display());
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| TransifexCiError::file_op(dir, "读取", e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| TransifexCiError::file_op(dir, "读取", e))?.path();
        let is_ts = path.extension().and_then(|e| e.to_str()) == Some(project_config::TS_EXTENSION);
        if is_ts && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
