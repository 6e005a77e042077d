//! Field mapping between the exchange's Russian labels and the English
//! output schema, plus the value transforms applied to special fields.
//!
//! The tables are an injected configuration object: compiled-in defaults
//! cover the production site, and a TOML file can replace them for
//! localization or testing.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Output column for the exchange trading code, filled from the listing.
pub const FIELD_SECURITY_SYMBOL: &str = "Security Symbol";
/// Output column derived from the interest-payment-dates clause.
pub const FIELD_FIRST_PAYMENT_DATE: &str = "First Payment Date";

pub const FIELD_ISIN: &str = "ISIN";
pub const FIELD_FULL_NAME_ISSUER: &str = "Full Name Issuer";
pub const FIELD_SECURITY_CATEGORY: &str = "Security Category";
pub const FIELD_COUPON_FREQUENCY: &str = "Coupon Frequency";
pub const FIELD_INTEREST_PAYMENT_DATES: &str = "Interest Payment Dates";

/// English fields whose Russian values are reduced to Yes/No.
const BOOLEAN_FIELDS: &[&str] = &[
    "Early Redemption Option",
    "Trading Restrictions (incl. qualified investors)",
    "Included in the exchange index universe",
];

/// Russian label -> canonical English name, in output declaration order.
const DEFAULT_FIELDS: &[(&str, &str)] = &[
    ("ISIN код", "ISIN"),
    ("Регистрационный номер", "Registration Number"),
    ("Вид, категория (тип) ценной бумаги", "Security Category"),
    ("Идентификационный код ценной бумаги", "Security Identification Code"),
    (
        "Международный код классификации финансовых инструментов (CFI), присвоенный ценным бумагам",
        "CFI code assigned to the securities",
    ),
    (
        "Международный код классификации финансовых инструментов (CFI), присвоенный ценным бумагам на дату принятия решения о листинге ценных бумаг",
        "CFI code as of the listing decision date",
    ),
    ("Номер серии", "Series Number"),
    ("Номинальная стоимость", "Face Value"),
    ("Валюта номинальной стоимости", "Face Value Currency"),
    ("Общее количество ценных бумаг в выпуске, шт.", "Issue Size, pcs"),
    ("Дата выпуска", "Issue Date"),
    ("Ставка купона", "Coupon"),
    ("Дата погашения", "Maturity Date"),
    ("Порядок выплаты процентов", "Coupon Frequency"),
    ("Даты выплаты процентов", "Interest Payment Dates"),
    (
        "Информация о размере текущего процента (купона) по облигациям (о порядке определения размера)",
        "Current Coupon Information (calculation method)",
    ),
    ("Сумма погашения", "Redemption Amount"),
    (
        "Указание на наличие возможности досрочного погашения облигаций",
        "Early Redemption Option",
    ),
    ("Раздел Списка", "Listing Section"),
    (
        "Дата принятия решения о включении ценных бумаг в Список",
        "Decision date to include in the List",
    ),
    ("Дата включения ценных бумаг в Список", "Listing Inclusion Date"),
    (
        "Биржа, на которой ценные бумаги эмитента прошли процедуру листинга",
        "Listing Exchange",
    ),
    ("Дата начала организованных торгов", "Start Date Organized Trading"),
    (
        "Режимы торгов, в которых возможно заключение договоров",
        "Available Trading Modes",
    ),
    ("Группа инструментов", "Instrument Group"),
    ("Лот", "Lot Size"),
    ("Шаг цены", "Price Tick"),
    ("Валюта цены", "Price Quotation Units"),
    ("Валюта расчетов", "Settlement Currency"),
    (
        "Указание на то, что ценные бумаги ограничены в обороте (в том числе предназначены для квалифицированных инвесторов)",
        "Trading Restrictions (incl. qualified investors)",
    ),
    (
        "Указание на то, что ценные бумаги включены в базу расчета индексов организатора торговли",
        "Included in the exchange index universe",
    ),
    ("Полное наименование эмитента", "Full Name Issuer"),
    ("Государство учреждения эмитента", "Country Incorporation"),
    (
        "Идентификационный номер налогоплательщика эмитента (при наличии)",
        "Issuer TIN",
    ),
    ("Юридический адрес эмитента", "Legal Address"),
    ("Информация о фактах дефолта эмитента", "Information Issuer Default Events"),
    (
        "Информация о фактах технического дефолта эмитента",
        "Information Issuer Technical Default Events",
    ),
    (
        "Адрес страницы сайта в сети Интернет, используемой для раскрытия информации для инвесторов",
        "Issuer's Investor Relations Website",
    ),
    (
        "Адрес страницы иностранной биржи в сети Интернет, на которой раскрывается информация об эмитенте иностранных ценных бумаг и о ценных бумагах данного эмитента",
        "Foreign Exchange Disclosure Page",
    ),
    (
        "Адрес страницы государственного органа, и/или уполномоченного лица в сети Интернет, на которой раскрывается информация об эмитенте иностранных ценных бумаг и о ценных бумагах данного эмитента",
        "Competent Authority/OAM Disclosure Page",
    ),
    ("Годовые отчеты, раскрытые эмитентом", "Annual Reports Disclosed Issuer"),
];

/// Coupon-frequency phrase -> payments per year. Checked in order;
/// longer phrases first so "раз в полугодие" wins over "год".
const DEFAULT_COUPON_FREQUENCY: &[(&str, &str)] = &[
    ("один раз в полугодие в конце полугодия", "2"),
    ("раз в полугодие", "2"),
    ("полугодие", "2"),
    ("ежеквартально", "4"),
    ("раз в квартал", "4"),
    ("квартал", "4"),
    ("ежемесячно", "12"),
    ("раз в месяц", "12"),
    ("месяц", "12"),
    ("один раз в год", "1"),
    ("раз в год", "1"),
    ("ежегодно", "1"),
    ("год", "1"),
];

/// Boolean phrase table. Negative phrases come first so
/// "не предусмотрена" is not swallowed by the "предусмотрена" substring.
const DEFAULT_BOOLEANS: &[(&str, &str)] = &[
    ("не предусмотрена", "No"),
    ("не предусмотрено", "No"),
    ("нет", "No"),
    ("да", "Yes"),
    ("предусмотрена", "Yes"),
    ("предусмотрено", "Yes"),
    ("есть", "Yes"),
];

/// Genitive Russian month names as they appear in payment-date clauses.
const MONTHS: &[(&str, &str)] = &[
    ("января", "01"),
    ("февраля", "02"),
    ("марта", "03"),
    ("апреля", "04"),
    ("мая", "05"),
    ("июня", "06"),
    ("июля", "07"),
    ("августа", "08"),
    ("сентября", "09"),
    ("октября", "10"),
    ("ноября", "11"),
    ("декабря", "12"),
];

/// One label mapping entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    /// Label text as rendered on the site.
    pub label: String,
    /// Canonical English output name.
    pub name: String,
}

/// One phrase-table entry for value transforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseEntry {
    pub phrase: String,
    pub value: String,
}

/// The injected mapping tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMap {
    /// Label dictionary in output declaration order.
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldEntry>,
    #[serde(default = "default_coupon_frequency")]
    pub coupon_frequency: Vec<PhraseEntry>,
    #[serde(default = "default_booleans")]
    pub booleans: Vec<PhraseEntry>,
}

fn default_fields() -> Vec<FieldEntry> {
    DEFAULT_FIELDS
        .iter()
        .map(|(label, name)| FieldEntry {
            label: (*label).to_string(),
            name: (*name).to_string(),
        })
        .collect()
}

fn default_coupon_frequency() -> Vec<PhraseEntry> {
    DEFAULT_COUPON_FREQUENCY
        .iter()
        .map(|(phrase, value)| PhraseEntry {
            phrase: (*phrase).to_string(),
            value: (*value).to_string(),
        })
        .collect()
}

fn default_booleans() -> Vec<PhraseEntry> {
    DEFAULT_BOOLEANS
        .iter()
        .map(|(phrase, value)| PhraseEntry {
            phrase: (*phrase).to_string(),
            value: (*value).to_string(),
        })
        .collect()
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            coupon_frequency: default_coupon_frequency(),
            booleans: default_booleans(),
        }
    }
}

impl FieldMap {
    /// Load a mapping from a TOML file. Missing tables fall back to the
    /// compiled-in defaults.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Resolve a Russian label to its English name.
    pub fn lookup(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.name.as_str())
    }

    /// English names in declaration order.
    pub fn english_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|entry| entry.name.as_str())
    }

    /// Whether a field's value is reduced to Yes/No.
    pub fn is_boolean_field(&self, name: &str) -> bool {
        BOOLEAN_FIELDS.contains(&name)
    }

    /// Reduce a coupon-frequency description to payments per year.
    ///
    /// Falls back to the first integer in the text, then to the text
    /// itself.
    pub fn parse_coupon_frequency(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let lower = text.to_lowercase();
        for entry in &self.coupon_frequency {
            if lower.contains(&entry.phrase) {
                return entry.value.clone();
            }
        }

        let digits = Regex::new(r"(\d+)").unwrap();
        if let Some(caps) = digits.captures(text) {
            return caps[1].to_string();
        }

        text.to_string()
    }

    /// Reduce a Russian boolean description to Yes/No.
    ///
    /// Empty means the page offered nothing, which reads as No.
    pub fn parse_boolean(&self, text: &str) -> String {
        if text.is_empty() {
            return "No".to_string();
        }

        let lower = text.to_lowercase();
        for entry in &self.booleans {
            if lower.contains(&entry.phrase) {
                return entry.value.clone();
            }
        }

        text.to_string()
    }
}

/// Parse an interest-payment-dates clause.
///
/// Returns the formatted `[MM/DD ; MM/DD]` token list and the first
/// payment date (`MM/DD/YYYY`) when a "начиная с" clause names one.
/// Text with no recognizable dates passes through unchanged.
pub fn parse_interest_payment_dates(text: &str) -> (String, String) {
    if text.is_empty() {
        return (String::new(), String::new());
    }

    let lower = text.to_lowercase();

    let month_alternation = MONTHS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join("|");
    let date_re = Regex::new(&format!(r"(\d{{1,2}})\s+({month_alternation})")).unwrap();

    // The "начиная с" clause repeats the first payment date; keep each
    // token once, in order of first appearance.
    let mut formatted: Vec<String> = Vec::new();
    for caps in date_re.captures_iter(&lower) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month = month_number(&caps[2]);
        let token = format!("{month}/{day:02}");
        if !formatted.contains(&token) {
            formatted.push(token);
        }
    }

    if formatted.is_empty() {
        // No recognizable dates; keep the original wording.
        return (text.to_string(), String::new());
    }

    let dates = format!("[{}]", formatted.join(" ; "));

    let first_re = Regex::new(r"начиная с (\d{1,2})\s+([\wа-яё]+)\s+(\d{4})").unwrap();
    let first = first_re
        .captures(&lower)
        .map(|caps| {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month = month_number(&caps[2]);
            let year = &caps[3];
            format!("{month}/{day:02}/{year}")
        })
        .unwrap_or_default();

    (dates, first)
}

fn month_number(name: &str) -> &'static str {
    MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, number)| *number)
        .unwrap_or("??")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_declaration_order() {
        let map = FieldMap::default();
        assert_eq!(map.lookup("ISIN код"), Some("ISIN"));
        assert_eq!(map.lookup("Лот"), Some("Lot Size"));
        assert_eq!(map.lookup("нет такого поля"), None);
        assert_eq!(map.english_names().next(), Some("ISIN"));
    }

    #[test]
    fn test_coupon_frequency_phrases() {
        let map = FieldMap::default();
        assert_eq!(map.parse_coupon_frequency("Один раз в полугодие в конце полугодия"), "2");
        assert_eq!(map.parse_coupon_frequency("ежеквартально"), "4");
        assert_eq!(map.parse_coupon_frequency("Ежемесячно"), "12");
        assert_eq!(map.parse_coupon_frequency("один раз в год"), "1");
    }

    #[test]
    fn test_coupon_frequency_digit_fallback() {
        let map = FieldMap::default();
        assert_eq!(map.parse_coupon_frequency("2 выплаты"), "2");
        assert_eq!(map.parse_coupon_frequency("по решению эмитента"), "по решению эмитента");
        assert_eq!(map.parse_coupon_frequency(""), "");
    }

    #[test]
    fn test_boolean_phrases() {
        let map = FieldMap::default();
        assert_eq!(map.parse_boolean("Да"), "Yes");
        assert_eq!(map.parse_boolean("Предусмотрена"), "Yes");
        assert_eq!(map.parse_boolean("Нет"), "No");
        assert_eq!(map.parse_boolean(""), "No");
    }

    #[test]
    fn test_boolean_negation_wins_over_substring() {
        let map = FieldMap::default();
        assert_eq!(map.parse_boolean("Не предусмотрена"), "No");
        assert_eq!(map.parse_boolean("не предусмотрено"), "No");
    }

    #[test]
    fn test_payment_dates_formatting() {
        let (dates, first) = parse_interest_payment_dates("15 марта и 15 сентября каждого года");
        assert_eq!(dates, "[03/15 ; 09/15]");
        assert_eq!(first, "");
    }

    #[test]
    fn test_payment_dates_first_payment_clause() {
        let (dates, first) =
            parse_interest_payment_dates("5 июня и 5 декабря, начиная с 5 июня 2024 года");
        assert_eq!(dates, "[06/05 ; 12/05]");
        assert_eq!(first, "06/05/2024");
    }

    #[test]
    fn test_payment_dates_unparseable_passes_through() {
        let (dates, first) = parse_interest_payment_dates("в даты, определяемые эмитентом");
        assert_eq!(dates, "в даты, определяемые эмитентом");
        assert_eq!(first, "");
    }

    #[test]
    fn test_field_map_toml_override() {
        let toml_text = r#"
            [[fields]]
            label = "Поле"
            name = "Field"
        "#;
        let map: FieldMap = toml::from_str(toml_text).unwrap();
        assert_eq!(map.lookup("Поле"), Some("Field"));
        assert_eq!(map.fields.len(), 1);
        // Unspecified tables keep their defaults.
        assert_eq!(map.parse_boolean("да"), "Yes");
    }
}
