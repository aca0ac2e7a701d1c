//! 安全预览读取
//!
//! 将已通过验证的文件异步编码为 data URL，拒绝不是图像数据的内容。
//! 多个文件可以并发读取，各自独立成功或失败。

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use pacs_core::{FileMetadata, PacsError, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

const IMAGE_DATA_PREFIX: &str = "data:image/";
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// 预分配缓冲区上限，声明的大小只作为提示
const MAX_PREALLOC_BYTES: usize = 8 * 1024 * 1024;

/// 上传文件句柄
#[async_trait]
pub trait FileSource: Send + Sync {
    /// 文件元数据
    fn metadata(&self) -> &FileMetadata;

    /// 打开读取流
    async fn open(&self) -> io::Result<Box<dyn AsyncRead + Send + Unpin>>;

    /// 读取全部内容
    async fn read_all(&self) -> io::Result<Vec<u8>> {
        let mut reader = self.open().await?;
        let mut buf = Vec::with_capacity(prealloc_len(self.metadata().size));
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

fn prealloc_len(declared_size: u64) -> usize {
    usize::try_from(declared_size)
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOC_BYTES)
}

/// 内存中的上传文件
#[derive(Debug, Clone)]
pub struct InMemoryFile {
    metadata: FileMetadata,
    bytes: Arc<[u8]>,
}

impl InMemoryFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            metadata: FileMetadata::new(name, bytes.len() as u64, media_type),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl FileSource for InMemoryFile {
    fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    async fn open(&self) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        Ok(Box::new(io::Cursor::new(self.bytes.clone())))
    }
}

/// 磁盘上的文件，MIME类型由扩展名推断
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
    metadata: FileMetadata,
}

impl DiskFile {
    /// 读取文件元数据
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let fs_metadata = tokio::fs::metadata(&path).await?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = mime_guess::from_path(&path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();

        Ok(Self {
            metadata: FileMetadata::new(name, fs_metadata.len(), media_type),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for DiskFile {
    fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    async fn open(&self) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(Box::new(file))
    }
}

/// 读取文件预览
///
/// 打开或读取失败返回 `ReadFailed`，内容不是 `data:image/` 开头返回 `InvalidImageData`。
pub async fn read_preview(source: &dyn FileSource) -> Result<String> {
    let metadata = source.metadata();

    let bytes = source
        .read_all()
        .await
        .map_err(|e| PacsError::ReadFailed(format!("{}: {}", metadata.name, e)))?;

    let data_url = encode_data_url(&metadata.media_type, &bytes);
    check_image_data_url(&data_url)?;

    debug!("预览读取完成: {} ({} 字节)", metadata.name, bytes.len());
    Ok(data_url)
}

/// 并发读取多个文件预览，结果顺序与输入一致
pub async fn read_previews(sources: Vec<Arc<dyn FileSource>>) -> Vec<Result<String>> {
    let handles: Vec<_> = sources
        .into_iter()
        .map(|source| tokio::spawn(async move { read_preview(source.as_ref()).await }))
        .collect();

    let mut previews = Vec::with_capacity(handles.len());
    for handle in handles {
        let preview = match handle.await {
            Ok(preview) => preview,
            Err(e) => Err(PacsError::ReadFailed(e.to_string())),
        };
        if let Err(e) = &preview {
            warn!("预览读取失败: {}", e);
        }
        previews.push(preview);
    }
    previews
}

fn encode_data_url(media_type: &str, bytes: &[u8]) -> String {
    let media_type = if media_type.trim().is_empty() {
        FALLBACK_MEDIA_TYPE
    } else {
        media_type
    };
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

fn check_image_data_url(data_url: &str) -> Result<()> {
    if !data_url.starts_with("data:") || !data_url.contains(";base64,") {
        return Err(PacsError::ReadFailed("读取结果不是 data URL".to_string()));
    }
    if !data_url.starts_with(IMAGE_DATA_PREFIX) {
        return Err(PacsError::InvalidImageData);
    }
    Ok(())
}
