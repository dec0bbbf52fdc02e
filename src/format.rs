use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 金额显示格式 (屏幕、文档导出、表格导出各自调用)
///
/// `format` 的输出再经 `parse` 解析必须能还原出按 `decimal_places` 取整后的值,
/// 实时重算依赖这一点保持幂等。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountFormat {
    pub decimal_places: u32,
    pub grouping_separator: char,
    pub decimal_separator: char,
}

impl Default for AmountFormat {
    fn default() -> Self {
        Self {
            decimal_places: 2,
            grouping_separator: ',',
            decimal_separator: '.',
        }
    }
}

impl AmountFormat {
    /// 按配置精度取整 (四舍五入，远离零)
    pub fn round(&self, value: &BigDecimal) -> BigDecimal {
        let places = i64::from(self.decimal_places);
        value.round(places).with_scale(places)
    }

    /// 格式化为带千分位的文本, 如 `-1,234,567.80`
    pub fn format(&self, value: &BigDecimal) -> String {
        let places = self.decimal_places as usize;
        let (digits, _) = self.round(value).as_bigint_and_exponent();
        let raw = digits.to_string();
        let (negative, raw) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };

        // 左侧补零，保证整数部分至少一位
        let padded = format!("{:0>width$}", raw, width = places + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - places);

        let mut out = String::with_capacity(padded.len() + padded.len() / 3 + 2);
        if negative {
            out.push('-');
        }
        for (idx, ch) in int_part.chars().enumerate() {
            if idx > 0 && (int_part.len() - idx) % 3 == 0 {
                out.push(self.grouping_separator);
            }
            out.push(ch);
        }
        if places > 0 {
            out.push(self.decimal_separator);
            out.push_str(frac_part);
        }
        out
    }

    /// 解析单元格文本; 空白或无法解析一律视为 0
    pub fn parse(&self, text: &str) -> BigDecimal {
        let trimmed = text.trim();
        let (negative, body) = match trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) => (true, inner),
            None => (false, trimmed),
        };

        let cleaned: String = body
            .chars()
            .filter(|c| *c != self.grouping_separator && !c.is_whitespace())
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();
        if cleaned.is_empty() {
            return BigDecimal::zero();
        }

        match BigDecimal::from_str(&cleaned) {
            Ok(value) if negative => -value,
            Ok(value) => value,
            Err(_) => {
                tracing::debug!("无法解析金额文本 {:?}, 按 0 处理", text);
                BigDecimal::zero()
            }
        }
    }
}
