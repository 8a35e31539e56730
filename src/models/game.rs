//! 游戏数据模型
//!
//! 检索单元：带有预计算语义向量和 Steam 结构化元数据的游戏记录。
//! 记录由外部富化管道产出，核心子系统只读。

use serde::{Deserialize, Serialize};

/// 发行状态枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ReleaseStatus {
    /// 已发行
    #[serde(rename = "released")]
    #[default]
    Released,

    /// 抢先体验
    #[serde(rename = "early_access")]
    EarlyAccess,

    /// 即将推出
    #[serde(rename = "coming_soon")]
    ComingSoon,

    /// 未发行/未知
    #[serde(rename = "unreleased")]
    Unreleased,
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseStatus::Released => write!(f, "released"),
            ReleaseStatus::EarlyAccess => write!(f, "early_access"),
            ReleaseStatus::ComingSoon => write!(f, "coming_soon"),
            ReleaseStatus::Unreleased => write!(f, "unreleased"),
        }
    }
}

/// 发现来源类型枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum SourceKind {
    /// Twitter 抓取
    #[serde(rename = "twitter")]
    Twitter,

    /// Steam 新品列表
    #[serde(rename = "steam")]
    #[default]
    Steam,

    /// 人工收录
    #[serde(rename = "curated")]
    Curated,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Twitter => write!(f, "twitter"),
            SourceKind::Steam => write!(f, "steam"),
            SourceKind::Curated => write!(f, "curated"),
        }
    }
}

/// 发现来源归属
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DiscoverySource {
    /// 来源类型
    pub kind: SourceKind,
    /// 来源标识（推文 ID、列表名等）
    pub reference: Option<String>,
}

/// 结构化元数据（来自 Steam 商店页）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameMetadata {
    /// 标签列表
    pub tags: Vec<String>,
    /// 游玩模式列表（single-player, co-op, multiplayer...）
    pub play_modes: Vec<String>,
    /// 价格展示文本
    pub price: String,
    /// 是否免费
    pub is_free: bool,
    /// 发行状态
    pub release_status: ReleaseStatus,
}

impl GameMetadata {
    /// 元数据是否可用于类型/特性过滤
    pub fn is_filterable(&self) -> bool {
        !self.tags.is_empty() || !self.play_modes.is_empty()
    }
}

/// 媒体资源引用
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MediaRefs {
    /// 头图 URL
    pub header_image: Option<String>,
    /// 截图 URL 列表
    pub screenshots: Vec<String>,
    /// 预告片 URL
    pub trailer: Option<String>,
}

/// 核心游戏记录
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameRecord {
    /// 稳定标识（Steam app id）
    pub app_id: String,

    /// 展示标题
    pub title: String,

    /// 商店页描述文本
    pub description: String,

    /// 结构化元数据
    pub metadata: GameMetadata,

    /// 媒体资源
    pub media: MediaRefs,

    /// 语义向量（外部嵌入模型产出，固定维度）
    pub embedding: Option<Vec<f32>>,

    /// 发现来源归属
    pub source: DiscoverySource,
}

impl GameRecord {
    /// 创建新游戏记录
    pub fn new(app_id: &str, title: &str, description: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    /// 可用于相似度检索的向量。
    ///
    /// 缺失或全零向量返回 None：余弦相似度对零模长向量未定义，
    /// 调用方依赖此守卫。
    pub fn usable_embedding(&self) -> Option<&[f32]> {
        match &self.embedding {
            Some(v) if !v.is_empty() && v.iter().any(|x| *x != 0.0) => Some(v.as_slice()),
            _ => None,
        }
    }
}

/// 富化记录：按发现来源组织的嵌入视图
///
/// 与 `GameRecord`（Steam 元数据视图）互补，不同策略消费不同形态。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EnrichedRecord {
    /// 来源归属
    pub source: DiscoverySource,
    /// 语义向量
    pub embedding: Vec<f32>,
    /// 关联的游戏记录
    pub game: GameRecord,
}

impl EnrichedRecord {
    /// 可用于相似度检索的向量（同 [`GameRecord::usable_embedding`] 守卫）
    pub fn usable_embedding(&self) -> Option<&[f32]> {
        if !self.embedding.is_empty() && self.embedding.iter().any(|x| *x != 0.0) {
            Some(self.embedding.as_slice())
        } else {
            self.game.usable_embedding()
        }
    }
}
