//! Ordered pattern tables shared by the extractors.
//!
//! Every list here is first-match-wins. Reordering entries changes which
//! label wins on ambiguous input, so treat the order as part of the data.

use lazy_static::lazy_static;
use regex::Regex;

/// Year-like prefix of the 13-digit institutional student id.
pub const ID_PREFIX: &str = "2025";
pub const INSTITUTIONAL_ID_LEN: usize = 13;
pub const LEGACY_ID_LEN: usize = 8;

/// Phrases that look like 2-4 character names but are slogans, greetings or
/// generic mail vocabulary.
pub const NAME_BLOCKLIST: &[&str] = &[
    // mottos students put in signatures
    "认真生活", "端正态度", "好好学习", "天天向上", "努力学习",
    "认真学习", "态度端正", "生活态度", "学习态度",
    "作业完成", "提交作业", "课程作业", "实验报告",
    // reply / greeting vocabulary
    "回复", "转发", "老师", "同学", "您好", "你好", "老师好", "老师您好",
    "谢谢", "谢谢老师", "请查收", "查收", "附件", "主题", "原始主题",
    // assignment vocabulary
    "提交", "作业", "报告", "智能合约", "平台", "搭建", "实践", "课程",
    "实训", "最终", "期末", "大作业", "项目", "实验", "设计", "补交",
    "重交", "修订", "学号", "姓名", "学生", "提交人",
    // latin
    "re", "fw", "fwd", "name", "hw", "lab", "project", "report", "assignment",
];

/// Substrings that never occur inside a real name.
pub const NAME_POISON: &[&str] = &[
    "作业", "报告", "实验", "项目", "课程", "设计", "提交", "主题", "附件", "第",
];

/// Trailing label words glued to a labeled name capture ("张三学号").
pub const NAME_TRAILING_LABELS: &[&str] = &["学号", "班级", "作业", "专业", "提交", "同学"];

pub const COMMON_SURNAMES: &[char] = &[
    '王', '李', '张', '刘', '陈', '杨', '赵', '黄', '周', '吴', '徐', '孙', '胡', '朱', '高',
    '林', '何', '郭', '马', '罗', '梁', '宋', '郑', '谢', '韩', '唐', '冯', '于', '董', '萧',
    '程', '曹', '袁', '邓', '许', '傅', '沈', '曾', '彭', '吕', '苏', '卢', '蒋', '蔡', '贾',
    '丁', '魏', '薛', '叶', '阎',
];

pub const COMPOUND_SURNAMES: &[&str] = &[
    "欧阳", "司马", "诸葛", "上官", "东方", "慕容", "皇甫", "令狐", "夏侯", "尉迟",
];

/// Keywords marking a resubmission.
pub const RESUBMISSION_KEYWORDS: &[&str] = &["补交", "重交", "修订", "resubmit", "revise", "makeup"];

/// A regex plus the capture group holding the value (0 = whole match).
pub struct GroupPattern {
    pub regex: Regex,
    pub group: usize,
}

impl GroupPattern {
    fn new(pattern: &str, group: usize) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            group,
        }
    }

    /// First non-empty value this pattern yields in `text`.
    pub fn first_value<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.captures_iter(text).find_map(|caps| {
            caps.get(self.group)
                .map(|m| m.as_str().trim())
                .filter(|value| !value.is_empty())
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

lazy_static! {
    /// "姓名：张三" style labels, in priority order.
    pub static ref LABELED_NAME_PATTERNS: Vec<GroupPattern> = vec![
        GroupPattern::new(r"姓\s*名\s*[:：]?\s*([\x{4e00}-\x{9fa5}]{2,4})", 1),
        GroupPattern::new(r"学生\s*[:：]?\s*([\x{4e00}-\x{9fa5}]{2,4})", 1),
        GroupPattern::new(r"我是\s*([\x{4e00}-\x{9fa5}]{2,4})", 1),
        GroupPattern::new(r"提交人\s*[:：]?\s*([\x{4e00}-\x{9fa5}]{2,4})", 1),
        GroupPattern::new(r"(?i)name\s*[:：]\s*([a-z]{2,20})", 1),
    ];

    /// Labeled assignment fragments, used when the residual text is empty.
    pub static ref FRAGMENT_PATTERNS: Vec<GroupPattern> = vec![
        GroupPattern::new(r"作业\s*[:：]\s*([^\n\r，。；;]{1,20})", 1),
        GroupPattern::new(r"第[一二三四五六七八九十0-9]+次作业", 0),
        GroupPattern::new(r"作业[一二三四五六七八九十0-9]+", 0),
        GroupPattern::new(r"实验[一二三四五六七八九十0-9]+", 0),
        GroupPattern::new(r"(?i)(?:^|[^a-z])(project\s*[0-9]*)", 1),
        GroupPattern::new(r"(?i)(?:^|[^a-z])(lab\s*[0-9]*)", 1),
        GroupPattern::new(r"(?i)(?:^|[^a-z])(assignment\s*[0-9]*)", 1),
        GroupPattern::new(r"(?i)(?:^|[^a-z])(hw\s*[0-9]*)", 1),
        GroupPattern::new(r"项目\s*[:：]\s*([^\n\r，。；;]{1,20})", 1),
        GroupPattern::new(r"实验\s*[:：]\s*([^\n\r，。；;]{1,20})", 1),
        GroupPattern::new(r"标题\s*[:：]\s*([^\n\r，。；;]{1,20})", 1),
        GroupPattern::new(r"提交\s*[:：]\s*([^\n\r，。；;]{1,20})", 1),
        GroupPattern::new(r"最终报告\s*[:：]?\s*([^\n\r，。；;]{1,20})", 1),
        GroupPattern::new(r"报告\s*[:：]\s*([^\n\r，。；;]{1,20})", 1),
        GroupPattern::new(r"(?i)report\s*[:：]\s*([^\n\r，。；;]{1,20})", 1),
    ];

    /// Text right after a digit run that marks it as a mailbox login.
    pub static ref RX_MAIL_TAIL: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]*\s*@\s*[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
    pub static ref RX_MAIL_DOMAIN_SUFFIX: Regex = Regex::new(
        r"^(?i)(?:qq|foxmail|163|126|yeah|gmail|outlook|hotmail|sina|sohu)\.(?:com|cn|net)"
    )
    .unwrap();
}
