//! 统一错误处理模块
//!
//! 提供Transifex同步工具的统一错误类型定义和处理机制

// 标准库导入
use std::path::Path;

// 第三方crate导入
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Transifex CI 统一错误类型
///
/// 所有错误都会传递到CLI边界并以非零退出码结束进程，不做自动重试。
#[derive(Debug, Error)]
pub enum TransifexCiError {
    /// 配置缺失或无法解析
    #[error("配置错误 [{field}]: {reason}")]
    Configuration {
        /// 配置项名称
        field: String,
        /// 错误原因
        reason: String,
    },

    /// 令牌被拒绝或组织不存在
    #[error("{detail}", detail = auth_description(.organization, .reason))]
    Authentication {
        /// 组织slug（请求层无法确定时为None）
        organization: Option<String>,
        /// 错误原因
        reason: String,
    },

    /// 试图创建已存在的对象
    #[error("远程{kind}已存在: {slug}")]
    RemoteConflict {
        /// 对象类型（项目、资源等）
        kind: String,
        /// 冲突的slug
        slug: String,
    },

    /// 领域前置条件不满足
    #[error("翻译操作失败: {message}")]
    Translation {
        /// 具体错误信息
        message: String,
    },

    /// 外部工具退出码非零或无法启动
    #[error("外部工具执行失败 [{tool}]: {status}", status = exit_description(.code))]
    ExternalTool {
        /// 工具路径
        tool: String,
        /// 进程退出码（被信号终止或无法启动时为None）
        code: Option<i32>,
    },

    /// Transifex API返回了非成功状态
    #[error("Transifex API错误 [{status}] {url}: {message}")]
    RemoteApi {
        /// HTTP状态码
        status: u16,
        /// 错误消息
        message: String,
        /// 请求地址
        url: String,
    },

    /// 网络传输失败
    #[error("{detail}", detail = network_description(.message, .status_code))]
    Network {
        /// 错误消息
        message: String,
        /// HTTP状态码（如果适用）
        status_code: Option<u16>,
    },

    /// 本地文件操作失败
    #[error("文件{operation}操作失败 [{path}]: {source}")]
    FileOperation {
        /// 文件路径
        path: String,
        /// 操作类型（读取、写入、创建等）
        operation: String,
        /// 底层错误
        #[source]
        source: std::io::Error,
    },

    /// 内部处理错误（包装anyhow::Error）
    #[error("内部处理错误: {source:#}")]
    Internal {
        /// 包装的错误
        source: AnyhowError,
    },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("退出码 {}", code),
        None => "进程未正常退出".to_string(),
    }
}

fn auth_description(organization: &Option<String>, reason: &str) -> String {
    match organization {
        Some(organization) => format!("Transifex认证失败 [{}]: {}", organization, reason),
        None => format!("Transifex认证失败: {}", reason),
    }
}

fn network_description(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("网络请求失败 [{}]: {}", code, message),
        None => format!("网络请求失败: {}", message),
    }
}

impl TransifexCiError {
    /// 为请求层产生的认证错误补上组织slug
    pub fn for_organization(self, organization: &str) -> Self {
        match self {
            TransifexCiError::Authentication {
                organization: None,
                reason,
            } => TransifexCiError::Authentication {
                organization: Some(organization.to_string()),
                reason,
            },
            other => other,
        }
    }

    /// 在错误消息前标注作用域，如 `资源/语言`
    ///
    /// 文件错误本身带路径，不再改写。
    pub fn scoped(self, scope: &str) -> Self {
        match self {
            TransifexCiError::RemoteApi {
                status,
                message,
                url,
            } => TransifexCiError::RemoteApi {
                status,
                message: format!("[{}] {}", scope, message),
                url,
            },
            TransifexCiError::Network {
                message,
                status_code,
            } => TransifexCiError::Network {
                message: format!("[{}] {}", scope, message),
                status_code,
            },
            TransifexCiError::Translation { message } => TransifexCiError::Translation {
                message: format!("[{}] {}", scope, message),
            },
            TransifexCiError::Authentication {
                organization,
                reason,
            } => TransifexCiError::Authentication {
                organization,
                reason: format!("[{}] {}", scope, reason),
            },
            TransifexCiError::Internal { source } => TransifexCiError::Internal {
                source: source.context(format!("[{}]", scope)),
            },
            other => other,
        }
    }


    /// 构造带路径信息的文件操作错误
    pub fn file_op(path: &Path, operation: &str, source: std::io::Error) -> Self {
        TransifexCiError::FileOperation {
            path: path.display().to_string(),
            operation: operation.to_string(),
            source,
        }
    }

    /// 进程退出码
    ///
    /// 外部工具的退出码原样传递，其他错误统一为1。
    pub fn exit_code(&self) -> i32 {
        match self {
            TransifexCiError::ExternalTool {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Transifex CI 结果类型别名
pub type Result<T> = std::result::Result<T, TransifexCiError>;

/// 便捷的错误创建宏
#[macro_export]
macro_rules! ci_error {
    (config, $field:expr, $reason:expr) => {
        $crate::error::TransifexCiError::Configuration {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
    (auth, $org:expr, $reason:expr) => {
        $crate::error::TransifexCiError::Authentication {
            organization: Some($org.to_string()),
            reason: $reason.to_string(),
        }
    };
    (conflict, $kind:expr, $slug:expr) => {
        $crate::error::TransifexCiError::RemoteConflict {
            kind: $kind.to_string(),
            slug: $slug.to_string(),
        }
    };
    (translation, $msg:expr) => {
        $crate::error::TransifexCiError::Translation {
            message: $msg.to_string(),
        }
    };
    (tool, $tool:expr, $code:expr) => {
        $crate::error::TransifexCiError::ExternalTool {
            tool: $tool.to_string(),
            code: $code,
        }
    };
    (remote_api, $status:expr, $msg:expr, $url:expr) => {
        $crate::error::TransifexCiError::RemoteApi {
            status: $status,
            message: $msg.to_string(),
            url: $url.to_string(),
        }
    };
}

/// 从anyhow::Error转换为TransifexCiError
impl From<AnyhowError> for TransifexCiError {
    fn from(error: AnyhowError) -> Self {
        TransifexCiError::Internal { source: error }
    }
}

/// 从reqwest::Error转换为TransifexCiError
impl From<reqwest::Error> for TransifexCiError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        TransifexCiError::Network {
            message: error.to_string(),
            status_code,
        }
    }
}

/// 从std::io::Error转换为TransifexCiError
impl From<std::io::Error> for TransifexCiError {
    fn from(error: std::io::Error) -> Self {
        TransifexCiError::FileOperation {
            path: "unknown".to_string(),
            operation: "io".to_string(),
            source: error,
        }
    }
}
