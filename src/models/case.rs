//! 案例模型与发现
//!
//! 一个案例对应一名学员提交的一份学习单：
//! `<输入根目录>/<案例名>/images/` 下的照片集合

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CaseError, ConfigError};

/// 支持的图片扩展名（大小写不敏感）
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// 单个评估案例
///
/// 只描述输入位置，不持有图片内容
#[derive(Clone, Debug)]
pub struct WorksheetCase {
    /// 案例名（文件夹名）
    pub name: String,
    /// 案例目录
    pub dir: PathBuf,
}

impl WorksheetCase {
    /// 案例的图片子目录
    pub fn images_dir(&self) -> PathBuf {
        self.dir.join("images")
    }

    /// 按字典序列出案例中的原始图片
    ///
    /// images/ 不存在、不可读或没有任何支持的图片时都视为输入错误
    pub fn list_raw_images(&self) -> Result<Vec<PathBuf>, CaseError> {
        let images_dir = self.images_dir();
        let entries = std::fs::read_dir(&images_dir).map_err(|_| CaseError::Input {
            dir: images_dir.clone(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_supported_extension(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(CaseError::Input { dir: images_dir });
        }
        Ok(paths)
    }
}

/// 判断扩展名是否受支持
fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// 发现输入根目录下的所有案例
///
/// # 参数
/// - `input_dir`: 输入根目录
/// - `filter`: 只处理指定名称的案例；目标不存在属于致命配置错误
///
/// # 返回
/// 按案例名字典序返回；一个案例都没有同样是致命配置错误
pub async fn discover_cases(
    input_dir: &Path,
    filter: Option<&str>,
) -> Result<Vec<WorksheetCase>, ConfigError> {
    if let Some(name) = filter {
        let dir = input_dir.join(name);
        if !dir.is_dir() {
            return Err(ConfigError::CaseNotFound { path: dir });
        }
        debug!("只处理指定案例: {}", name);
        return Ok(vec![WorksheetCase {
            name: name.to_string(),
            dir,
        }]);
    }

    let mut entries =
        tokio::fs::read_dir(input_dir)
            .await
            .map_err(|e| ConfigError::InputDirUnreadable {
                path: input_dir.to_path_buf(),
                source: e,
            })?;

    let mut cases = Vec::new();
    while let Some(entry) =
        entries
            .next_entry()
            .await
            .map_err(|e| ConfigError::InputDirUnreadable {
                path: input_dir.to_path_buf(),
                source: e,
            })?
    {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        // 隐藏目录不算案例
        if name.starts_with('.') {
            continue;
        }
        cases.push(WorksheetCase { name, dir: path });
    }

    cases.sort_by(|a, b| a.name.cmp(&b.name));

    if cases.is_empty() {
        return Err(ConfigError::EmptyCaseSet {
            path: input_dir.to_path_buf(),
        });
    }

    debug!("发现 {} 个案例", cases.len());
    Ok(cases)
}
