use std::path::{Path, PathBuf};

use tracing::debug;

use crate::api_constants::project_config;

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 插件的翻译文件目录: <plugin_root>/i18n
pub fn i18n_dir(plugin_root: &Path) -> PathBuf {
    plugin_root.join(project_config::I18N_DIR)
}

/// 翻译源文件路径: <plugin_root>/i18n/<resource>_<lang>.ts
pub fn local_translation_path(plugin_root: &Path, resource: &str, lang: &str) -> PathBuf {
    i18n_dir(plugin_root).join(format!(
        "{}_{}.{}",
        resource,
        lang,
        project_config::TS_EXTENSION
    ))
}

/// 相对于根目录的路径，统一使用'/'分隔
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// 在PATH中查找可执行文件
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| executable_candidates(&dir, program))
        .find(|candidate| candidate.is_file())
}

fn executable_candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    let mut candidates = vec![dir.join(program)];
    if cfg!(windows) {
        candidates.push(dir.join(format!("{}.exe", program)));
    }
    candidates
}

/// 解析外部工具路径
///
/// 找不到时退回裸程序名，交由进程启动时报错。
pub fn resolve_tool(program: &str) -> PathBuf {
    match find_in_path(program) {
        Some(path) => {
            debug!("找到外部工具 {}: {}", program, path.display());
            path
        }
        None => {
            debug!("PATH中未找到 {}，使用程序名", program);
            PathBuf::from(program)
        }
    }
}
