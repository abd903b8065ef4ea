// Animation configuration: `frameCount=3;frameRate=2;frameList=1,2,0,2`

use super::diagnostics::Diagnostics;
use super::error::{CursorError, Result};

pub const DEFAULT_FRAME_RATE: u32 = 1;

/// Validated animation settings for one animated cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AniConfig {
    /// Number of unique images stored in the file.
    pub frame_count: u32,
    /// Default display rate in jiffies (1/60 s).
    pub frame_rate: u32,
    /// Display order as frame indices, each below `frame_count`.
    pub frame_list: Option<Vec<u32>>,
    /// Per-step display rates, never zero and at most `step_count()` long.
    /// Missing trailing steps run at `frame_rate`; see `step_rates`.
    pub rate_list: Option<Vec<u32>>,
}

/// The four recognised options as they appear in the source text, before
/// validation. An option that failed to parse is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AniOptions {
    pub frame_count: Option<u32>,
    pub frame_rate: Option<u32>,
    pub frame_list: Option<Vec<u32>>,
    pub rate_list: Option<Vec<u32>>,
}

impl AniOptions {
    /// Splits the configuration string into options. Malformed entries,
    /// unknown keys and unparseable values are reported and skipped.
    pub fn parse(text: &str, diags: &mut Diagnostics) -> Self {
        let mut options = Self::default();
        let text = text.trim();
        let text = text.strip_suffix(';').unwrap_or(text);

        for item in text.split(';') {
            let Some((name, value)) = item.split_once('=') else {
                diags.warn(format!(
                    "option is missing value '{}', format: optionName=value",
                    item
                ));
                continue;
            };
            let name = name.trim();
            let value = value.trim();

            match name {
                "frameCount" => options.frame_count = parse_scalar(name, value, diags),
                "frameRate" => options.frame_rate = parse_scalar(name, value, diags),
                "frameList" => options.frame_list = parse_list(name, value, diags),
                "rateList" => options.rate_list = parse_list(name, value, diags),
                _ => diags.warn(format!("unknown option '{}'", name)),
            }
        }

        options
    }
}

fn parse_scalar(name: &str, value: &str, diags: &mut Diagnostics) -> Option<u32> {
    match value.parse::<u32>() {
        Ok(v) => Some(v),
        Err(_) => {
            diags.warn(format!("invalid value '{}' for option '{}'", value, name));
            None
        }
    }
}

fn parse_list(name: &str, value: &str, diags: &mut Diagnostics) -> Option<Vec<u32>> {
    let items = value.strip_suffix(',').unwrap_or(value);
    match items
        .split(',')
        .map(|n| n.trim().parse::<u32>())
        .collect::<std::result::Result<Vec<_>, _>>()
    {
        Ok(list) => Some(list),
        Err(_) => {
            diags.warn(format!("invalid value '{}' for option '{}'", value, name));
            None
        }
    }
}

impl AniConfig {
    pub fn parse(text: &str, diags: &mut Diagnostics) -> Result<Self> {
        Self::from_options(AniOptions::parse(text, diags), diags)
    }

    pub fn from_options(options: AniOptions, diags: &mut Diagnostics) -> Result<Self> {
        let frame_count = match options.frame_count {
            None => return Err(CursorError::MissingFrameCount),
            Some(0) => return Err(CursorError::ZeroFrameCount),
            Some(n) => n,
        };

        if let Some(frame_list) = &options.frame_list {
            if let Some(&index) = frame_list.iter().find(|&&i| i >= frame_count) {
                return Err(CursorError::FrameIndexOutOfRange { index, frame_count });
            }
        }

        let frame_rate = match options.frame_rate {
            Some(0) => {
                diags.warn("'frameRate' cannot be zero");
                DEFAULT_FRAME_RATE
            }
            Some(rate) => rate,
            None => DEFAULT_FRAME_RATE,
        };

        let expected_len = options
            .frame_list
            .as_ref()
            .map_or(frame_count as usize, Vec::len);

        let rate_list = options.rate_list.map(|mut rates| {
            let mut zero_rate = false;
            for rate in rates.iter_mut().filter(|r| **r == 0) {
                *rate = 1;
                zero_rate = true;
            }
            if zero_rate {
                diags.warn("no rate in 'rateList' can be zero");
            }

            if rates.len() != expected_len {
                diags.warn(format!(
                    "'rateList' was expected to have {} elements but had {}",
                    expected_len,
                    rates.len()
                ));
            }
            rates.truncate(expected_len);
            rates
        });

        Ok(Self {
            frame_count,
            frame_rate,
            frame_list: options.frame_list,
            rate_list,
        })
    }

    /// Number of entries in the displayed sequence.
    pub fn step_count(&self) -> u32 {
        self.frame_list
            .as_ref()
            .map_or(self.frame_count, |list| list.len() as u32)
    }

    /// Whether explicit `rate` and `seq ` chunks are needed.
    pub fn has_sequence(&self) -> bool {
        self.frame_list.is_some() || self.rate_list.is_some()
    }

    /// Display rate of every step, in jiffies. A short `rate_list` is padded
    /// with `frame_rate`.
    pub fn step_rates(&self) -> Vec<u32> {
        let steps = self.step_count() as usize;
        let mut rates = self.rate_list.clone().unwrap_or_default();
        rates.resize(steps, self.frame_rate);
        rates
    }

    /// Frame index shown at every step.
    pub fn step_frames(&self) -> Vec<u32> {
        match &self.frame_list {
            Some(frames) => frames.clone(),
            None => (0..self.step_count()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (Result<AniConfig>, Vec<String>) {
        let mut diags = Diagnostics::new();
        let result = AniConfig::parse(text, &mut diags);
        let warnings = diags.warnings().map(str::to_string).collect();
        (result, warnings)
    }

    #[test]
    fn test_frame_count_only() {
        let (cfg, warnings) = parse("frameCount=4");
        let cfg = cfg.unwrap();

        assert_eq!(cfg.frame_count, 4);
        assert_eq!(cfg.frame_rate, 1);
        assert_eq!(cfg.step_count(), 4);
        assert!(!cfg.has_sequence());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_full_example() {
        let (cfg, warnings) = parse(" frameCount=3; frameRate = 2 ;frameList=1,2,0,2,; ");
        let cfg = cfg.unwrap();

        assert_eq!(cfg.frame_rate, 2);
        assert_eq!(cfg.frame_list, Some(vec![1, 2, 0, 2]));
        assert_eq!(cfg.step_count(), 4);
        assert_eq!(cfg.step_rates(), vec![2, 2, 2, 2]);
        assert!(cfg.has_sequence());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_zero_rates_coerced() {
        let (cfg, warnings) = parse("frameCount=3;rateList=5,0,7");
        assert_eq!(cfg.unwrap().rate_list, Some(vec![5, 1, 7]));
        assert_eq!(warnings, vec!["no rate in 'rateList' can be zero"]);
    }

    #[test]
    fn test_frame_list_defines_steps() {
        let (cfg, _) = parse("frameCount=2;frameList=0,1,0");
        let cfg = cfg.unwrap();
        assert_eq!(cfg.step_count(), 3);
        assert_eq!(cfg.step_frames(), vec![0, 1, 0]);
    }

    #[test]
    fn test_fatal_cases() {
        assert!(matches!(parse("frameCount=0").0, Err(CursorError::ZeroFrameCount)));
        assert!(matches!(parse("frameRate=3").0, Err(CursorError::MissingFrameCount)));
        assert!(matches!(
            parse("frameCount=5;frameList=7").0,
            Err(CursorError::FrameIndexOutOfRange {
                index: 7,
                frame_count: 5
            })
        ));
        assert!(matches!(
            parse("frameCount=2;frameList=0,2").0,
            Err(CursorError::FrameIndexOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn test_zero_frame_rate() {
        let (cfg, warnings) = parse("frameCount=2;frameRate=0");
        assert_eq!(cfg.unwrap().frame_rate, 1);
        assert_eq!(warnings, vec!["'frameRate' cannot be zero"]);
    }

    #[test]
    fn test_rate_list_padding_and_truncation() {
        let (cfg, warnings) = parse("frameCount=4;frameRate=6;rateList=2,3");
        assert_eq!(cfg.unwrap().step_rates(), vec![2, 3, 6, 6]);
        assert_eq!(
            warnings,
            vec!["'rateList' was expected to have 4 elements but had 2"]
        );

        let (cfg, warnings) = parse("frameCount=2;rateList=1,2,3,4");
        assert_eq!(cfg.unwrap().rate_list, Some(vec![1, 2]));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_rate_list_follows_step_count() {
        let (cfg, warnings) = parse("frameCount=2;frameList=0,1,1,0;rateList=3,4");
        let cfg = cfg.unwrap();
        assert_eq!(cfg.step_rates(), vec![3, 4, 1, 1]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let (cfg, warnings) = parse("frameCount=2;loop;speed=3;frameRate=fast;frameList=1,x");
        let cfg = cfg.unwrap();

        assert_eq!(cfg.frame_rate, 1);
        assert_eq!(cfg.frame_list, None);
        assert_eq!(
            warnings,
            vec![
                "option is missing value 'loop', format: optionName=value",
                "unknown option 'speed'",
                "invalid value 'fast' for option 'frameRate'",
                "invalid value '1,x' for option 'frameList'",
            ]
        );
    }

    #[test]
    fn test_out_of_range_integer() {
        let (cfg, warnings) = parse("frameCount=4294967296");
        assert!(matches!(cfg, Err(CursorError::MissingFrameCount)));
        assert_eq!(
            warnings,
            vec!["invalid value '4294967296' for option 'frameCount'"]
        );

        let (cfg, _) = parse("frameCount=4294967295");
        assert_eq!(cfg.unwrap().frame_count, u32::MAX);
    }

    #[test]
    fn test_huge_frame_count_with_short_rate_list() {
        let (cfg, warnings) = parse("frameCount=4294967295;rateList=2,3");
        let cfg = cfg.unwrap();
        assert_eq!(cfg.rate_list, Some(vec![2, 3]));
        assert_eq!(
            warnings,
            vec!["'rateList' was expected to have 4294967295 elements but had 2"]
        );
    }

    #[test]
    fn test_last_occurrence_wins() {
        let (cfg, _) = parse("frameCount=3;frameCount=x");
        assert!(matches!(cfg, Err(CursorError::MissingFrameCount)));

        let (cfg, _) = parse("frameCount=x;frameCount=3");
        assert_eq!(cfg.unwrap().frame_count, 3);
    }
}
