//! Conversion Queries

/// 按转换 ID 查找产物
#[derive(Debug, Clone)]
pub struct GetArtifact {
    pub conversion_id: String,
}

/// 分页获取转换历史
#[derive(Debug, Clone)]
pub struct ListHistory {
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListHistory {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}
