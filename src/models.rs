use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityRecord {
    pub id: i64,
    pub name: String,
    pub electorate_size: u64,
    pub votes_2018: Option<u64>,
    pub votes_2022: Option<u64>,
    pub target_max_2026: Option<u64>,
    pub target_mid_2026: Option<u64>,
    pub target_min_2026: Option<u64>,
}

/// Row shape served by the hosted backend table.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRow {
    #[serde(rename = "NUM")]
    pub num: i64,
    #[serde(rename = "CIDADE")]
    pub cidade: String,
    #[serde(rename = "NUM_ELEITORES")]
    pub num_eleitores: i64,
    #[serde(rename = "DEP_ESTADUAL_2018")]
    pub dep_estadual_2018: Option<i64>,
    #[serde(rename = "DEP_ESTADUAL_2022")]
    pub dep_estadual_2022: Option<i64>,
    #[serde(rename = "PROJECAO_2026_MAX")]
    pub projecao_2026_max: Option<i64>,
    #[serde(rename = "PROJECAO_2026_MED")]
    pub projecao_2026_med: Option<i64>,
    #[serde(rename = "PROJECAO_2026_MIN")]
    pub projecao_2026_min: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Year {
    Y2018,
    Y2022,
    Y2026,
}

impl Year {
    pub const ALL: [Year; 3] = [Year::Y2018, Year::Y2022, Year::Y2026];

    pub fn as_u16(self) -> u16 {
        match self {
            Year::Y2018 => 2018,
            Year::Y2022 => 2022,
            Year::Y2026 => 2026,
        }
    }
}

impl From<Year> for u16 {
    fn from(year: Year) -> Self {
        year.as_u16()
    }
}

impl TryFrom<u16> for Year {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2018 => Ok(Year::Y2018),
            2022 => Ok(Year::Y2022),
            2026 => Ok(Year::Y2026),
            other => Err(format!("unsupported year {other}")),
        }
    }
}

impl FromStr for Year {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u16 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid year '{}'", s.trim()))?;
        Year::try_from(value)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Set of reporting years gating series and columns. May be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSelection(BTreeSet<Year>);

impl YearSelection {
    pub fn all() -> Self {
        Self(Year::ALL.into_iter().collect())
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, year: Year) -> bool {
        self.0.contains(&year)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Year> + '_ {
        self.0.iter().copied()
    }

    /// Selection with `year` flipped. Returns `None` when that would drop the last active year.
    pub fn toggled(&self, year: Year) -> Option<Self> {
        let mut next = self.0.clone();
        if !next.remove(&year) {
            next.insert(year);
        } else if next.is_empty() {
            return None;
        }
        Some(Self(next))
    }

    pub fn to_query_value(&self) -> String {
        self.iter()
            .map(|year| year.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for YearSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Year> for YearSelection {
    fn from_iter<I: IntoIterator<Item = Year>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for YearSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Year::from_str)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElectorateBucket {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "0-50000")]
    Under50k,
    #[serde(rename = "50000-200000")]
    From50kTo200k,
    #[serde(rename = "200000-500000")]
    From200kTo500k,
    #[serde(rename = "500000+")]
    Over500k,
}

impl ElectorateBucket {
    pub const ALL: [ElectorateBucket; 5] = [
        ElectorateBucket::All,
        ElectorateBucket::Under50k,
        ElectorateBucket::From50kTo200k,
        ElectorateBucket::From200kTo500k,
        ElectorateBucket::Over500k,
    ];

    /// Inclusive lower bound and exclusive upper bound; `None` when unbounded.
    pub fn bounds(self) -> Option<(u64, Option<u64>)> {
        match self {
            ElectorateBucket::All => None,
            ElectorateBucket::Under50k => Some((0, Some(50_000))),
            ElectorateBucket::From50kTo200k => Some((50_000, Some(200_000))),
            ElectorateBucket::From200kTo500k => Some((200_000, Some(500_000))),
            ElectorateBucket::Over500k => Some((500_000, None)),
        }
    }

    pub fn contains(self, electorate_size: u64) -> bool {
        match self.bounds() {
            None => true,
            Some((min, max)) => {
                electorate_size >= min && max.is_none_or(|max| electorate_size < max)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElectorateBucket::All => "all",
            ElectorateBucket::Under50k => "0-50000",
            ElectorateBucket::From50kTo200k => "50000-200000",
            ElectorateBucket::From200kTo500k => "200000-500000",
            ElectorateBucket::Over500k => "500000+",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ElectorateBucket::All => "Todas",
            ElectorateBucket::Under50k => "Até 50 mil",
            ElectorateBucket::From50kTo200k => "50 mil – 200 mil",
            ElectorateBucket::From200kTo500k => "200 mil – 500 mil",
            ElectorateBucket::Over500k => "Acima de 500 mil",
        }
    }
}

impl FromStr for ElectorateBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ElectorateBucket::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == s)
            .ok_or_else(|| format!("unknown electorate bucket '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Electorate,
    Votes2018,
    Votes2022,
    TargetMax2026,
    TargetMid2026,
    TargetMin2026,
    EffectiveTarget2026,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Descending,
    Ascending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CityFilter {
    pub query: String,
    pub bucket: ElectorateBucket,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilters {
    pub city: CityFilter,
    pub years: YearSelection,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub q: Option<String>,
    pub bucket: Option<String>,
    pub years: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedCityMetric {
    #[serde(flatten)]
    pub record: CityRecord,
    pub growth_pct: Option<f64>,
    pub effective_target_2026: Option<u64>,
}

/// Sum of a field alongside how many records actually carried a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FieldTotal {
    pub sum: u64,
    pub defined: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GrowthCounts {
    pub growing: usize,
    pub declining: usize,
    pub stable: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareSlice {
    pub id: i64,
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectorateDistribution {
    pub leaders: Vec<ShareSlice>,
    pub others: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotesSeries {
    pub year: Year,
    pub label: &'static str,
    pub values: Vec<Option<u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotesChart {
    pub categories: Vec<String>,
    pub series: Vec<VotesSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthBar {
    pub name: String,
    pub growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub city_count: usize,
    pub total_electorate: u64,
    pub votes_2018: FieldTotal,
    pub votes_2022: FieldTotal,
    pub target_2026: FieldTotal,
    pub target_min_2026: FieldTotal,
    pub growth_2018_2022: f64,
    pub growth_2022_2026: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub comparison_available: bool,
    pub counts: GrowthCounts,
    pub top_growth: Vec<DerivedCityMetric>,
    pub top_decline: Vec<DerivedCityMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardResponse {
    pub years: YearSelection,
    pub bucket: ElectorateBucket,
    pub query: String,
    pub loaded_at: String,
    pub summary: DashboardSummary,
    pub filtered_count: usize,
    pub cities: Vec<DerivedCityMetric>,
    pub votes_chart: VotesChart,
    pub electorate_chart: ElectorateDistribution,
    pub growth_chart: Vec<GrowthBar>,
    pub performance: PerformanceSummary,
    pub target_leaders: Vec<DerivedCityMetric>,
}

#[derive(Debug, Serialize)]
pub struct CitiesResponse {
    pub count: usize,
    pub cities: Vec<DerivedCityMetric>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_bounds_are_half_open() {
        let bucket = ElectorateBucket::From50kTo200k;
        assert!(bucket.contains(50_000));
        assert!(bucket.contains(199_999));
        assert!(!bucket.contains(200_000));
        assert!(!bucket.contains(49_999));
        assert!(ElectorateBucket::Over500k.contains(500_000));
        assert!(!ElectorateBucket::Over500k.contains(499_999));
        assert!(!ElectorateBucket::From200kTo500k.contains(500_000));
        assert!(ElectorateBucket::Over500k.contains(u64::MAX));
        assert!(ElectorateBucket::All.contains(0));
    }

    #[test]
    fn bucket_parses_wire_names() {
        assert_eq!("500000+".parse::<ElectorateBucket>(), Ok(ElectorateBucket::Over500k));
        assert_eq!(" all ".parse::<ElectorateBucket>(), Ok(ElectorateBucket::All));
        assert!("0-10".parse::<ElectorateBucket>().is_err());
    }

    #[test]
    fn year_selection_parses_comma_list() {
        let years: YearSelection = "2026, 2018".parse().unwrap();
        assert!(years.contains(Year::Y2018));
        assert!(!years.contains(Year::Y2022));
        assert_eq!(years.to_query_value(), "2018,2026");

        let empty: YearSelection = "".parse().unwrap();
        assert!(empty.is_empty());
        assert!("2019".parse::<YearSelection>().is_err());
    }

    #[test]
    fn toggling_refuses_to_drop_last_year() {
        let only: YearSelection = [Year::Y2022].into_iter().collect();
        assert_eq!(only.toggled(Year::Y2022), None);

        let both = only.toggled(Year::Y2018).unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(both.toggled(Year::Y2018), Some(only));
    }

    #[test]
    fn city_record_uses_camel_case_keys() {
        let record = CityRecord {
            id: 1,
            name: "Niterói".into(),
            electorate_size: 10,
            votes_2018: None,
            votes_2022: Some(3),
            target_max_2026: None,
            target_mid_2026: None,
            target_min_2026: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["electorateSize"], 10);
        assert_eq!(json["votes2022"], 3);
        assert!(json["votes2018"].is_null());
    }
}
