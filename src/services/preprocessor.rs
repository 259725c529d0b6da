//! 图片预处理服务 - 业务能力层
//!
//! 只负责"把一张原始照片归一化为适合模型阅读的灰度 PNG"这一能力
//!
//! ## 处理流水线（固定参数，顺序不可调换）
//! 1. 解码并转为灰度
//! 2. 直方图自动对比度（无裁剪边距）
//! 3. 对比度增强 ×3.0（基准：整图平均灰度）
//! 4. 亮度压暗 ×0.85（基准：纯黑）
//! 5. 锐度增强 ×2.0（基准：3×3 平滑图，1 像素边框不参与卷积）
//!
//! 同样的输入字节经过这条流水线，输出逐像素一致

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use tracing::debug;

use crate::error::CaseError;

/// 对比度增强系数
const CONTRAST_FACTOR: f32 = 3.0;
/// 亮度系数（小于 1 表示压暗）
const BRIGHTNESS_FACTOR: f32 = 0.85;
/// 锐度增强系数
const SHARPNESS_FACTOR: f32 = 2.0;
/// 平滑卷积核（锐化的退化基准），权重和为 13
const SMOOTH_KERNEL: [[u32; 3]; 3] = [[1, 1, 1], [1, 5, 1], [1, 1, 1]];
/// 平滑卷积核的权重和
const SMOOTH_KERNEL_SCALE: f32 = 13.0;

/// 图片预处理服务
///
/// 无状态，输出位置由调用方按案例传入
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// 创建新的预处理服务
    pub fn new() -> Self {
        Self
    }

    /// 归一化一张原始照片
    ///
    /// # 参数
    /// - `raw_path`: 原始图片路径
    /// - `case_output_dir`: 案例输出目录，PNG 写入其下的 preprocessed/ 子目录
    ///
    /// # 返回
    /// 返回归一化 PNG 的路径，文件名为 `<原文件主名>.png`
    pub fn normalize(&self, raw_path: &Path, case_output_dir: &Path) -> Result<PathBuf, CaseError> {
        let img = image::open(raw_path).map_err(|e| CaseError::decode(raw_path, e))?;
        debug!("解码成功: {} ({}x{})", raw_path.display(), img.width(), img.height());

        let gray = img.to_luma8();
        let gray = autocontrast(&gray);
        let gray = adjust_contrast(&gray, CONTRAST_FACTOR);
        let gray = adjust_brightness(&gray, BRIGHTNESS_FACTOR);
        let gray = sharpen(&gray, SHARPNESS_FACTOR);

        let preprocessed_dir = case_output_dir.join("preprocessed");
        std::fs::create_dir_all(&preprocessed_dir)
            .map_err(|e| CaseError::persist(&preprocessed_dir, e))?;

        let stem = raw_path.file_stem().unwrap_or_default().to_string_lossy();
        let out_path = preprocessed_dir.join(format!("{}.png", stem));
        gray.save(&out_path)
            .map_err(|e| CaseError::persist(&out_path, e))?;

        debug!("归一化完成: {}", out_path.display());
        Ok(out_path)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 像素级变换 ==========

/// 直方图自动对比度（无裁剪边距）
///
/// 把出现过的最暗/最亮灰度线性拉伸到 [0, 255]；全图同灰度时原样返回
fn autocontrast(img: &GrayImage) -> GrayImage {
    let mut lo = 255u8;
    let mut hi = 0u8;
    for pixel in img.pixels() {
        let v = pixel.0[0];
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if hi <= lo {
        return img.clone();
    }

    // 整数查表，端点精确落在 0 和 255
    let span = (hi - lo) as u32;
    let mut lut = [0u8; 256];
    for (ix, slot) in lut.iter_mut().enumerate() {
        let ix = ix as u32;
        *slot = if ix <= lo as u32 {
            0
        } else if ix >= hi as u32 {
            255
        } else {
            ((ix - lo as u32) * 255 / span) as u8
        };
    }
    map_pixels(img, |v| lut[v as usize])
}

/// 对比度增强：以整图平均灰度（四舍五入）为基准线性外推
fn adjust_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let mean = mean_gray(img);
    map_pixels(img, |v| blend(mean, v, factor))
}

/// 亮度调整：以纯黑为基准线性缩放
fn adjust_brightness(img: &GrayImage, factor: f32) -> GrayImage {
    map_pixels(img, |v| blend(0, v, factor))
}

/// 锐度增强：以平滑图为基准反向外推，放大边缘反差
///
/// 平滑图的 1 像素边框与原图相同，所以边框像素不会被改动
fn sharpen(img: &GrayImage, factor: f32) -> GrayImage {
    let smoothed = smooth(img);
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let base = smoothed.get_pixel(x, y).0[0];
        let value = img.get_pixel(x, y).0[0];
        *pixel = Luma([blend(base, value, factor)]);
    }
    out
}

/// 3×3 平滑卷积；不足 3×3 的图以及 1 像素边框保持原值
fn smooth(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut out = img.clone();
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sum = 0u32;
            for (ky, row) in SMOOTH_KERNEL.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let px = x + kx as u32 - 1;
                    let py = y + ky as u32 - 1;
                    sum += weight * img.get_pixel(px, py).0[0] as u32;
                }
            }
            out.put_pixel(x, y, Luma([(sum as f32 / SMOOTH_KERNEL_SCALE) as u8]));
        }
    }
    out
}

/// 线性混合：base + factor × (value − base)，截断到 [0, 255]
fn blend(base: u8, value: u8, factor: f32) -> u8 {
    (base as f32 + factor * (value as f32 - base as f32)).clamp(0.0, 255.0) as u8
}

/// 整图平均灰度，四舍五入到最近整数
fn mean_gray(img: &GrayImage) -> u8 {
    let count = (img.width() as u64) * (img.height() as u64);
    if count == 0 {
        return 0;
    }
    let total: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    (total as f64 / count as f64 + 0.5) as u8
}

/// 对每个像素应用同一映射
fn map_pixels(img: &GrayImage, f: impl Fn(u8) -> u8) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = f(pixel.0[0]);
    }
    out
}
