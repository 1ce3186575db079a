//! Speak Commands

use std::path::PathBuf;

/// 音频输出位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// 写入指定文件
    File(PathBuf),
    /// 写入目录，文件名由角色名和时间戳生成，扩展名取决于音频格式
    Directory(PathBuf),
}

/// 朗读截图命令
///
/// 分析 → 解析音色 → 合成 → 播放/保存
#[derive(Debug, Clone)]
pub struct SpeakImage {
    /// 编码后的截图
    pub image: Vec<u8>,
    /// 游戏/场景提示
    pub context_hint: String,
    pub output: Option<OutputTarget>,
    /// 是否在输出设备上播放
    pub play: bool,
}
