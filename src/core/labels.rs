// Detector label handling: localization, placeholders and the danger set.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use super::error::FeedbackError;

/// Output language for spoken alerts. Stored as its ISO code; the long
/// names are still read from older settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en", alias = "english")]
    English,
    #[serde(rename = "zh", alias = "chinese")]
    Chinese,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Chinese => "zh",
        }
    }
}

impl FromStr for Language {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "zh" | "chinese" => Ok(Self::Chinese),
            other => Err(FeedbackError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

lazy_static! {
    /// Classes that may trigger a critical alert.
    static ref DANGEROUS_LABELS: HashSet<&'static str> =
        ["car", "person", "bus", "truck"].into_iter().collect();

    static ref CHINESE_LABELS: HashMap<&'static str, &'static str> = [
        ("person", "行人"),
        ("bicycle", "自行车"),
        ("car", "汽车"),
        ("motorcycle", "摩托车"),
        ("airplane", "飞机"),
        ("bus", "公交车"),
        ("train", "火车"),
        ("truck", "卡车"),
        ("boat", "船只"),
        ("traffic light", "交通灯"),
        ("fire hydrant", "消防栓"),
        ("stop sign", "停车标志"),
        ("parking meter", "停车计时器"),
        ("bench", "长椅"),
        ("bird", "鸟类"),
        ("cat", "猫"),
        ("dog", "狗"),
        ("horse", "马"),
        ("sheep", "羊"),
        ("cow", "牛"),
        ("elephant", "大象"),
        ("bear", "熊"),
        ("zebra", "斑马"),
        ("giraffe", "长颈鹿"),
        ("backpack", "背包"),
        ("umbrella", "雨伞"),
        ("handbag", "手提包"),
        ("tie", "领带"),
        ("suitcase", "行李箱"),
        ("frisbee", "飞盘"),
        ("skis", "滑雪板"),
        ("snowboard", "滑雪单板"),
        ("sports ball", "运动球类"),
        ("kite", "风筝"),
        ("baseball bat", "棒球棒"),
        ("baseball glove", "棒球手套"),
        ("skateboard", "滑板"),
        ("surfboard", "冲浪板"),
        ("tennis racket", "网球拍"),
        ("bottle", "瓶子"),
        ("wine glass", "酒杯"),
        ("cup", "杯子"),
        ("fork", "叉子"),
        ("knife", "刀具"),
        ("spoon", "勺子"),
        ("bowl", "碗"),
        ("banana", "香蕉"),
        ("apple", "苹果"),
        ("sandwich", "三明治"),
        ("orange", "橙子"),
        ("broccoli", "西兰花"),
        ("carrot", "胡萝卜"),
        ("hot dog", "热狗"),
        ("pizza", "披萨"),
        ("donut", "甜甜圈"),
        ("cake", "蛋糕"),
        ("chair", "椅子"),
        ("couch", "沙发"),
        ("potted plant", "盆栽"),
        ("bed", "床"),
        ("dining table", "餐桌"),
        ("toilet", "马桶"),
        ("tv", "电视"),
        ("laptop", "笔记本"),
        ("mouse", "鼠标"),
        ("remote", "遥控器"),
        ("keyboard", "键盘"),
        ("cell phone", "手机"),
        ("microwave", "微波炉"),
        ("oven", "烤箱"),
        ("toaster", "烤面包机"),
        ("sink", "水槽"),
        ("refrigerator", "冰箱"),
        ("book", "书籍"),
        ("clock", "时钟"),
        ("vase", "花瓶"),
        ("scissors", "剪刀"),
        ("teddy bear", "玩偶"),
        ("hair drier", "吹风机"),
        ("toothbrush", "牙刷"),
        ("door", "门"),
        ("window", "窗户"),
        ("stairs", "楼梯"),
        ("curtain", "窗帘"),
        ("mirror", "镜子"),
    ]
    .into_iter()
    .collect();
}

/// Lookup key for a raw detector label: trimmed, lower-case, `_` as space.
pub fn canonical(raw: &str) -> String {
    raw.trim().replace('_', " ").to_lowercase()
}

/// Spoken name for a raw detector label. Unknown labels pass through.
pub fn localize(raw: &str, language: Language) -> String {
    let key = canonical(raw);
    match language {
        Language::English => key,
        Language::Chinese => CHINESE_LABELS
            .get(key.as_str())
            .map(|s| (*s).to_string())
            .unwrap_or(key),
    }
}

/// Labels the detector emits for "nothing in particular".
pub fn is_placeholder(raw: &str) -> bool {
    let key = canonical(raw);
    key == "unknown" || key.contains("background")
}

pub fn is_dangerous(raw: &str) -> bool {
    DANGEROUS_LABELS.contains(canonical(raw).as_str())
}
