//! Qt项目清单 (.pro) 生成
//!
//! 清单供 `pylupdate5` 读取，列出插件中所有的Python源文件、UI表单
//! 以及要更新的翻译源文件，路径都相对于插件根目录。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::ci_error;
use crate::error::{Result, TransifexCiError};
use crate::utils::relative_slash_path;

/// Qt项目清单
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectManifest {
    /// Python源文件
    pub sources: Vec<String>,
    /// UI表单
    pub forms: Vec<String>,
    /// 翻译源文件
    pub translations: Vec<String>,
}

impl ProjectManifest {
    /// 扫描插件目录
    ///
    /// 遍历顺序按文件名排序，保证同一棵目录树总是得到相同的清单。
    pub fn scan(plugin_root: &Path, ts_path: &Path) -> Result<Self> {
        let mut manifest = Self::default();

        for entry in WalkDir::new(plugin_root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| plugin_root.to_path_buf());
                match e.into_io_error() {
                    Some(io) => TransifexCiError::file_op(&path, "遍历", io),
                    None => ci_error!(translation, format!("目录遍历失败: {}", path.display())),
                }
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let target = match entry.path().extension().and_then(|e| e.to_str()) {
                Some("py") => &mut manifest.sources,
                Some("ui") => &mut manifest.forms,
                _ => continue,
            };

            if let Some(relative) = relative_slash_path(plugin_root, entry.path()) {
                target.push(relative);
            }
        }

        let translation = relative_slash_path(plugin_root, ts_path).ok_or_else(|| {
            ci_error!(
                translation,
                format!("翻译文件不在插件目录下: {}", ts_path.display())
            )
        })?;
        manifest.translations.push(translation);

        debug!(
            "清单扫描完成: {} 个源文件, {} 个表单",
            manifest.sources.len(),
            manifest.forms.len()
        );
        Ok(manifest)
    }

    /// 渲染清单文本
    pub fn render(&self) -> String {
        format!(
            "CODECFORTR = UTF-8\nSOURCES = {}\nFORMS = {}\nTRANSLATIONS = {}\n",
            self.sources.join(" "),
            self.forms.join(" "),
            self.translations.join(" ")
        )
    }

    /// 写入清单文件，覆盖已有内容
    pub fn write(&self, path: &Path) -> Result<PathBuf> {
        fs::write(path, self.render()).map_err(|e| TransifexCiError::file_op(path, "写入", e))?;
        info!("📄 已生成项目清单: {}", path.display());
        Ok(path.to_path_buf())
    }
}
