//! QGIS插件翻译同步库
//!
//! 在CI中把QGIS插件的Qt翻译文件与Transifex项目同步：推送源字符串、拉取各语言翻译，
//! 并调用 `pylupdate5` / `lrelease` 提取和编译翻译文件。

pub mod api_constants;
pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod http_api;
pub mod manifest;
pub mod remote;
pub mod runner;
pub mod translation;
pub mod utils;

pub use client::{Client, Project, Resource};
pub use config::RunParameters;
pub use error::{Result, TransifexCiError};
pub use translation::Translation;
