//! RFM (recency, frequency, monetary) bucket classification for display.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RfmSegment {
    Champions,
    LoyalCustomers,
    PotentialLoyalists,
    AtRisk,
    LostCustomers,
    NewCustomers,
    Unknown,
}

const ALL_SEGMENTS: [RfmSegment; 7] = [
    RfmSegment::Champions,
    RfmSegment::LoyalCustomers,
    RfmSegment::PotentialLoyalists,
    RfmSegment::AtRisk,
    RfmSegment::LostCustomers,
    RfmSegment::NewCustomers,
    RfmSegment::Unknown,
];

impl RfmSegment {
    /// Classify a three-digit score such as `"543"`, each digit 1-5. Blank or
    /// malformed scores are `Unknown`.
    pub fn classify(score: &str) -> Self {
        let digits: Option<Vec<u32>> = score
            .trim()
            .chars()
            .map(|c| c.to_digit(10).filter(|d| (1..=5).contains(d)))
            .collect();
        let Some([r, f, m]) = digits.and_then(|d| <[u32; 3]>::try_from(d).ok()) else {
            return RfmSegment::Unknown;
        };

        if r >= 4 && f >= 4 && m >= 4 {
            RfmSegment::Champions
        } else if r >= 3 && f >= 3 && m >= 3 {
            RfmSegment::LoyalCustomers
        } else if r >= 3 && f <= 2 {
            RfmSegment::PotentialLoyalists
        } else if r <= 2 && f >= 3 {
            RfmSegment::AtRisk
        } else if r <= 2 && f <= 2 {
            RfmSegment::LostCustomers
        } else {
            RfmSegment::NewCustomers
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RfmSegment::Champions => "Champions",
            RfmSegment::LoyalCustomers => "Loyal Customers",
            RfmSegment::PotentialLoyalists => "Potential Loyalists",
            RfmSegment::AtRisk => "At Risk",
            RfmSegment::LostCustomers => "Lost Customers",
            RfmSegment::NewCustomers => "New Customers",
            RfmSegment::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RfmBucket {
    pub segment: RfmSegment,
    pub label: &'static str,
    pub count: u64,
}

/// Count scores per bucket. Every bucket is listed, in display order.
pub fn distribution<'a, I>(scores: I) -> Vec<RfmBucket>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = [0u64; ALL_SEGMENTS.len()];
    for score in scores {
        let segment = RfmSegment::classify(score);
        counts[segment as usize] += 1;
    }
    ALL_SEGMENTS
        .iter()
        .zip(counts)
        .map(|(segment, count)| RfmBucket {
            segment: *segment,
            label: segment.label(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(RfmSegment::classify("555"), RfmSegment::Champions);
        assert_eq!(RfmSegment::classify("434"), RfmSegment::LoyalCustomers);
        assert_eq!(RfmSegment::classify("515"), RfmSegment::PotentialLoyalists);
        assert_eq!(RfmSegment::classify("141"), RfmSegment::AtRisk);
        assert_eq!(RfmSegment::classify("225"), RfmSegment::LostCustomers);
        // r >= 3, f >= 3 but m < 3 falls through every rule.
        assert_eq!(RfmSegment::classify("331"), RfmSegment::NewCustomers);
    }

    #[test]
    fn test_classify_malformed() {
        assert_eq!(RfmSegment::classify(""), RfmSegment::Unknown);
        assert_eq!(RfmSegment::classify("55"), RfmSegment::Unknown);
        assert_eq!(RfmSegment::classify("5a5"), RfmSegment::Unknown);
        assert_eq!(RfmSegment::classify("5555"), RfmSegment::Unknown);
    }

    #[test]
    fn test_classify_digits_out_of_range() {
        assert_eq!(RfmSegment::classify("999"), RfmSegment::Unknown);
        assert_eq!(RfmSegment::classify("000"), RfmSegment::Unknown);
        assert_eq!(RfmSegment::classify("506"), RfmSegment::Unknown);
        assert_eq!(RfmSegment::classify(" 111 "), RfmSegment::LostCustomers);
    }

    #[test]
    fn test_distribution_lists_every_bucket() {
        let buckets = distribution(["555", "545", "141", ""]);
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].segment, RfmSegment::Champions);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[3].label, "At Risk");
        assert_eq!(buckets[3].count, 1);
        assert_eq!(buckets[6].count, 1);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 4);
    }
}
