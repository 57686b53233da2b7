//! 配置模块，负责加载描述数据集的 JSON 文件

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::backend::{BoundingBox, Domain, DomainExtent, FieldSchema};

/// 未显式指定时读取的配置文件
pub const DEFAULT_CONFIG_FILE: &str = "datasets.json";

/// 覆盖配置文件路径的环境变量
pub const CONFIG_ENV_VAR: &str = "NEXGDDP_DATASETS";

/// 数据集配置错误
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "配置错误: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// 单个 `scenario/model` 数据集
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetFixture {
    /// 可查询字段及其描述
    #[serde(default)]
    pub fields: FieldSchema,
    /// 各维度的取值范围
    #[serde(default)]
    pub domain: Domain,
    /// 字段 -> 年份 -> 该年份内的采样值
    #[serde(default)]
    pub series: HashMap<String, BTreeMap<i64, Vec<f64>>>,
}

/// 数据集配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// 表名 (`scenario/model`) 到数据集的映射
    #[serde(default)]
    pub datasets: HashMap<String, DatasetFixture>,
    /// geostore id 到边界框的映射
    #[serde(default)]
    pub geostores: HashMap<String, BoundingBox>,
}

impl DatasetConfig {
    /// 从JSON文件加载数据集配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::new(format!(
                "配置文件不存在: {}",
                path_ref.display()
            )));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref)
            .map_err(|e| ConfigError::new(format!(
                "无法读取配置文件 {}: {}",
                path_ref.display(),
                e
            )))?;

        // 解析JSON
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::new(format!(
                "无法解析JSON配置文件 {}: {}",
                path_ref.display(),
                e
            )))
    }

    /// 按环境变量或默认文件名加载，失败时回退到内置示例
    pub fn load_or_default() -> Self {
        let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        match Self::from_json_file(&path) {
            Ok(config) => {
                log::info!("Loaded {} dataset(s) from {}", config.datasets.len(), path);
                config
            }
            Err(e) => {
                log::warn!("{}, using built-in sample dataset", e);
                Self::sample()
            }
        }
    }

    /// 内置示例数据集（用于测试或fallback）
    pub fn sample() -> Self {
        let mut fields = FieldSchema::new();
        fields.insert("year".to_string(), json!({"type": "date"}));
        fields.insert("tasmax".to_string(), json!({"type": "number"}));
        fields.insert("pr".to_string(), json!({"type": "number"}));

        let mut domain = Domain::new();
        domain.insert("year".to_string(), DomainExtent { min: json!(2000), max: json!(2005) });

        let mut series = HashMap::new();
        series.insert(
            "tasmax".to_string(),
            (2000..=2005).map(|y| (y, vec![20.0 + (y - 2000) as f64, 22.0 + (y - 2000) as f64])).collect(),
        );
        series.insert(
            "pr".to_string(),
            (2000..=2005).map(|y| (y, vec![1.0, 2.0, 3.0 + (y - 2000) as f64])).collect(),
        );

        let mut datasets = HashMap::new();
        datasets.insert("historical/ACCESS1-0".to_string(), DatasetFixture { fields, domain, series });

        let mut geostores = HashMap::new();
        geostores.insert("sample".to_string(), BoundingBox::new(-4.0, 40.0, -3.0, 41.0));

        Self { datasets, geostores }
    }
}
