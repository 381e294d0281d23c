use std::collections::BTreeSet;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};

use qgis_transifex_ci::config::{load_parameters, Cli, Command};
use qgis_transifex_ci::runner::SystemCommandRunner;
use qgis_transifex_ci::utils::init_logging;
use qgis_transifex_ci::{RunParameters, TransifexCiError, Translation};

fn main() {
    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    let start = Instant::now();
    match run(&cli) {
        Ok(()) => {
            debug!("总耗时: {:.3}秒", start.elapsed().as_secs_f64());
        }
        Err(e) => {
            error!("❌ 执行失败: {:#}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

/// 外部工具的退出码原样传出，其余错误为1
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<TransifexCiError>()
        .map(TransifexCiError::exit_code)
        .unwrap_or(1)
}

fn run(cli: &Cli) -> Result<()> {
    let params = load_parameters(&cli.config)
        .with_context(|| format!("加载配置失败: {}", cli.config.display()))?;
    info!(
        "🚀 插件 {} → {}/{}",
        params.plugin_path().display(),
        params.organization(),
        params.project()
    );

    // 本地命令不需要令牌
    match &cli.command {
        Command::UpdateStrings => {
            Translation::update_strings(&params, &SystemCommandRunner)
                .context("更新翻译源文件失败")?;
            return Ok(());
        }
        Command::CompileStrings => {
            Translation::compile_strings(&params, &SystemCommandRunner)
                .context("编译翻译文件失败")?;
            return Ok(());
        }
        _ => {}
    }

    let translation = connect(cli, params)?;

    match &cli.command {
        Command::Pull { languages } => {
            let files = translation.pull(languages).context("拉取翻译失败")?;
            info!("✅ 已拉取 {} 个翻译文件", files.len());
        }
        Command::Push => {
            translation.push().context("推送源文件失败")?;
            info!("✅ 推送完成");
        }
        Command::Languages => {
            let languages = translation
                .project()
                .languages()
                .collect::<qgis_transifex_ci::Result<BTreeSet<String>>>()
                .context("获取项目语言失败")?;
            for lang in languages {
                println!("{}", lang);
            }
        }
        Command::AddLanguages { codes } => {
            let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
            translation
                .project()
                .add_languages(&codes)
                .context("添加语言失败")?;
        }
        Command::Resources => {
            for resource in translation.project().resources() {
                println!("{}", resource.context("获取项目资源失败")?.slug());
            }
        }
        Command::UpdateStrings | Command::CompileStrings => {}
    }

    Ok(())
}

fn connect(cli: &Cli, params: RunParameters) -> Result<Translation> {
    let token = cli.token()?;
    Translation::new(params, token, cli.api_url.as_deref())
        .context("连接Transifex失败")
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgis_transifex_ci::ci_error;

    #[test]
    fn test_exit_code_survives_context() {
        let err = anyhow::Error::new(ci_error!(tool, "lrelease", Some(3))).context("编译翻译文件失败");
        assert_eq!(exit_code(&err), 3);

        let err = anyhow::Error::new(ci_error!(translation, "资源不存在")).context("拉取翻译失败");
        assert_eq!(exit_code(&err), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);
    }

    #[test]
    fn test_context_message_keeps_cause() {
        let err = anyhow::Error::new(ci_error!(translation, "资源 my_plugin 不存在"))
            .context("拉取翻译失败");
        let text = format!("{:#}", err);
        assert!(text.starts_with("拉取翻译失败"));
        assert!(text.contains("my_plugin"));
    }
}
