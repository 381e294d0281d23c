//! 外部工具调用

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::{debug, error};

use crate::ci_error;
use crate::error::Result;

/// 外部进程执行器
pub trait CommandRunner {
    /// 运行程序并等待结束，返回退出码（被信号终止时为None）
    fn run(&self, program: &Path, args: &[OsString]) -> Result<Option<i32>>;
}

/// 直接启动系统进程
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<Option<i32>> {
        debug!("执行: {} {:?}", program.display(), args);

        let status = Command::new(program).args(args).status().map_err(|e| {
            error!("❌ 无法启动 {}: {}", program.display(), e);
            ci_error!(tool, program.display(), None)
        })?;

        Ok(status.code())
    }
}

/// 运行外部工具，非零退出视为失败
pub fn run_checked(runner: &dyn CommandRunner, program: &Path, args: &[OsString]) -> Result<()> {
    match runner.run(program, args)? {
        Some(0) => Ok(()),
        code => Err(ci_error!(tool, program.display(), code)),
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use super::*;

    /// 记录调用参数的执行器
    pub struct RecordingRunner {
        exit_code: Option<i32>,
        calls: RefCell<Vec<(PathBuf, Vec<String>)>>,
    }

    impl RecordingRunner {
        pub fn exiting_with(exit_code: Option<i32>) -> Self {
            Self {
                exit_code,
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn succeeding() -> Self {
            Self::exiting_with(Some(0))
        }

        pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
            self.calls.borrow().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &Path, args: &[OsString]) -> Result<Option<i32>> {
            self.calls.borrow_mut().push((
                program.to_path_buf(),
                args.iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
            ));
            Ok(self.exit_code)
        }
    }
}
