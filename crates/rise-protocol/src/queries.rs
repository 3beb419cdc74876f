//! Query parameter parsing for location filters.
//!
//! This module turns the raw query-string values a client sends (bbox, WKT
//! geometry, vertical level, datetime, sort order, property filters) into
//! typed predicates. Every parser reports failures as
//! [`RiseError::InvalidFilterExpression`] naming the parameter and the text
//! that could not be understood.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use geo::Relate;
use serde::{Deserialize, Serialize};

use crate::errors::{RiseError, RiseResult};
use crate::geojson::Geometry;

/// Largest count accepted by the `Rn/start/step` vertical level form.
pub const MAX_RECURRING_LEVELS: usize = 1000;

fn parse_number(param: &str, raw: &str) -> RiseResult<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| RiseError::invalid_filter(param, raw, "a number"))?;
    if !value.is_finite() {
        return Err(RiseError::invalid_filter(param, raw, "a finite number"));
    }
    Ok(value)
}

/// Bounding box filter with an optional vertical range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BboxQuery {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,

    /// `(min_z, max_z)` when six values were given.
    pub z: Option<(f64, f64)>,
}

impl BboxQuery {
    /// Build from already-split numeric values.
    ///
    /// - 0 values: no filter
    /// - 4 values: `minx, miny, maxx, maxy`
    /// - 6 values: `minx, miny, minz, maxx, maxy, maxz`
    pub fn from_values(values: &[f64]) -> RiseResult<Option<Self>> {
        let rendered = || {
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };

        if values.iter().any(|v| !v.is_finite()) {
            return Err(RiseError::invalid_filter(
                "bbox",
                rendered(),
                "finite numbers",
            ));
        }

        let bbox = match *values {
            [] => return Ok(None),
            [min_x, min_y, max_x, max_y] => BboxQuery {
                min_x,
                min_y,
                max_x,
                max_y,
                z: None,
            },
            [min_x, min_y, min_z, max_x, max_y, max_z] => BboxQuery {
                min_x,
                min_y,
                max_x,
                max_y,
                z: Some((min_z, max_z)),
            },
            _ => {
                return Err(RiseError::invalid_filter(
                    "bbox",
                    rendered(),
                    "4 or 6 comma separated numbers",
                ))
            }
        };

        let z_inverted = bbox.z.map_or(false, |(lo, hi)| lo > hi);
        if bbox.min_x > bbox.max_x || bbox.min_y > bbox.max_y || z_inverted {
            return Err(RiseError::invalid_filter(
                "bbox",
                rendered(),
                "minimum values not greater than maximum values",
            ));
        }

        Ok(Some(bbox))
    }

    /// Parse the query-string form `minx,miny,maxx,maxy[,..]`.
    pub fn parse(bbox: &str) -> RiseResult<Option<Self>> {
        let bbox = bbox.trim();
        if bbox.is_empty() {
            return Ok(None);
        }
        let values = bbox
            .split(',')
            .map(|part| parse_number("bbox", part))
            .collect::<RiseResult<Vec<_>>>()?;
        Self::from_values(&values)
    }

    /// The vertical range of a six-value bbox.
    pub fn vertical_level(&self) -> Option<VerticalLevel> {
        self.z.map(|(lo, hi)| VerticalLevel::Range(lo, hi))
    }

    /// The horizontal box as a polygon.
    pub fn to_geometry(&self) -> QueryGeometry {
        let rect = geo::Rect::new(
            geo::Coord {
                x: self.min_x,
                y: self.min_y,
            },
            geo::Coord {
                x: self.max_x,
                y: self.max_y,
            },
        );
        QueryGeometry(geo::Geometry::Polygon(rect.to_polygon()))
    }
}

/// A client geometry used as a containment filter.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryGeometry(pub geo::Geometry<f64>);

impl QueryGeometry {
    /// Parse well-known text.
    pub fn from_wkt(wkt: &str) -> RiseResult<Self> {
        let tokens = tokenize(wkt)?;
        let mut parser = WktParser {
            input: wkt,
            tokens,
            pos: 0,
        };
        let geometry = parser.geometry()?;
        if let Some(token) = parser.peek() {
            return Err(parser.error(format!("end of input, found {}", token)));
        }
        Ok(QueryGeometry(geometry))
    }

    /// DE-9IM containment of a location geometry. Points on the boundary are
    /// not contained.
    pub fn contains(&self, location: &Geometry) -> RiseResult<bool> {
        let other = location.to_geo()?;
        Ok(self.0.relate(&other).is_contains())
    }

    pub fn as_geo(&self) -> &geo::Geometry<f64> {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(f64),
    LParen,
    RParen,
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Word(w) => write!(f, "'{}'", w),
            Token::Number(n) => write!(f, "'{}'", n),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
        }
    }
}

fn tokenize(input: &str) -> RiseResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            c if c.is_ascii_alphabetic() => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if !c.is_ascii_alphabetic() {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Word(input[start..end].to_ascii_uppercase()));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    let numeric = c.is_ascii_digit()
                        || matches!(c, '-' | '+' | '.' | 'e' | 'E');
                    if !numeric {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                let text = &input[start..end];
                let value: f64 = text.parse().map_err(|_| {
                    RiseError::invalid_filter("wkt", input, format!("a number, found '{}'", text))
                })?;
                tokens.push(Token::Number(value));
            }
            other => {
                return Err(RiseError::invalid_filter(
                    "wkt",
                    input,
                    format!("well-known text, found unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}

struct WktParser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> WktParser<'a> {
    fn error(&self, expected: impl Into<String>) -> RiseError {
        RiseError::invalid_filter("wkt", self.input, expected)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> RiseResult<()> {
        match self.next() {
            Some(ref t) if *t == expected => Ok(()),
            Some(t) => Err(self.error(format!("{}, found {}", expected, t))),
            None => Err(self.error(format!("{}, found end of input", expected))),
        }
    }

    /// Consume a `,` if present.
    fn comma(&mut self) -> bool {
        if self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn geometry(&mut self) -> RiseResult<geo::Geometry<f64>> {
        let kind = match self.next() {
            Some(Token::Word(w)) => w,
            Some(t) => return Err(self.error(format!("a geometry type, found {}", t))),
            None => return Err(self.error("a geometry type, found end of input")),
        };

        // Dimension tags; extra ordinates are dropped when coordinates are read.
        if let Some(Token::Word(tag)) = self.peek().cloned() {
            match tag.as_str() {
                "Z" | "M" | "ZM" => self.pos += 1,
                "EMPTY" => return Err(self.error("a non-empty geometry")),
                other => return Err(self.error(format!("'(', found '{}'", other))),
            }
        }

        let geometry = match kind.as_str() {
            "POINT" => {
                self.expect(Token::LParen)?;
                let c = self.coord()?;
                self.expect(Token::RParen)?;
                geo::Geometry::Point(geo::Point(c))
            }
            "LINESTRING" => geo::Geometry::LineString(self.line_string()?),
            "POLYGON" => geo::Geometry::Polygon(self.polygon()?),
            "MULTIPOINT" => geo::Geometry::MultiPoint(self.multi_point()?),
            "MULTILINESTRING" => {
                let lines = self.list(|p| p.line_string())?;
                geo::Geometry::MultiLineString(geo::MultiLineString(lines))
            }
            "MULTIPOLYGON" => {
                let polygons = self.list(|p| p.polygon())?;
                geo::Geometry::MultiPolygon(geo::MultiPolygon(polygons))
            }
            "GEOMETRYCOLLECTION" => {
                let members = self.list(|p| p.geometry())?;
                geo::Geometry::GeometryCollection(geo::GeometryCollection(members))
            }
            other => return Err(self.error(format!("a supported geometry type, found '{}'", other))),
        };
        Ok(geometry)
    }

    /// `( item, item, ... )`
    fn list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> RiseResult<T>,
    ) -> RiseResult<Vec<T>> {
        self.expect(Token::LParen)?;
        let mut items = vec![item(self)?];
        while self.comma() {
            items.push(item(self)?);
        }
        self.expect(Token::RParen)?;
        Ok(items)
    }

    fn coord(&mut self) -> RiseResult<geo::Coord<f64>> {
        let mut ordinates = Vec::with_capacity(4);
        while let Some(Token::Number(n)) = self.peek() {
            ordinates.push(*n);
            self.pos += 1;
        }
        match ordinates.as_slice() {
            [x, y] | [x, y, _] | [x, y, _, _] => Ok(geo::Coord { x: *x, y: *y }),
            _ => Err(self.error(format!(
                "a coordinate with 2 to 4 ordinates, found {}",
                ordinates.len()
            ))),
        }
    }

    fn line_string(&mut self) -> RiseResult<geo::LineString<f64>> {
        Ok(geo::LineString(self.list(|p| p.coord())?))
    }

    fn polygon(&mut self) -> RiseResult<geo::Polygon<f64>> {
        let mut rings = self.list(|p| p.line_string())?.into_iter();
        let exterior = rings
            .next()
            .ok_or_else(|| self.error("a polygon with at least one ring"))?;
        Ok(geo::Polygon::new(exterior, rings.collect()))
    }

    /// Accepts both `((x y), (x y))` and `(x y, x y)`.
    fn multi_point(&mut self) -> RiseResult<geo::MultiPoint<f64>> {
        let points = self.list(|p| {
            if p.peek() == Some(&Token::LParen) {
                p.pos += 1;
                let c = p.coord()?;
                p.expect(Token::RParen)?;
                Ok(geo::Point(c))
            } else {
                p.coord().map(geo::Point)
            }
        })?;
        Ok(geo::MultiPoint(points))
    }
}

/// Elevation filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerticalLevel {
    /// Inclusive `[lo, hi]`.
    Range(f64, f64),
    /// Exactly this value.
    Single(f64),
    /// Any of these values.
    EnumeratedList(Vec<f64>),
}

impl VerticalLevel {
    /// Parse a `z` parameter.
    ///
    /// Accepts formats:
    /// - Single value: `850`
    /// - Multiple values: `850,700,500`
    /// - Range: `0/3000` (lower/upper)
    /// - Recurring: `R5/1000/100` (R{count}/{start}/{step}), ascending
    pub fn parse(z: &str) -> RiseResult<Self> {
        let z = z.trim();

        if let Some(rest) = z.strip_prefix('R').or_else(|| z.strip_prefix('r')) {
            return Self::parse_recurring(z, rest);
        }

        if z.contains('/') {
            let parts: Vec<&str> = z.split('/').collect();
            if parts.len() != 2 {
                return Err(RiseError::invalid_filter("z", z, "a range lower/upper"));
            }
            let lo = parse_number("z", parts[0])?;
            let hi = parse_number("z", parts[1])?;
            if lo > hi {
                return Err(RiseError::invalid_filter(
                    "z",
                    z,
                    "a range whose lower bound is not above its upper bound",
                ));
            }
            return Ok(VerticalLevel::Range(lo, hi));
        }

        if z.contains(',') {
            let values = z
                .split(',')
                .map(|v| parse_number("z", v))
                .collect::<RiseResult<Vec<_>>>()?;
            return Ok(VerticalLevel::EnumeratedList(values));
        }

        Ok(VerticalLevel::Single(parse_number("z", z)?))
    }

    fn parse_recurring(raw: &str, rest: &str) -> RiseResult<Self> {
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != 3 {
            return Err(RiseError::invalid_filter(
                "z",
                raw,
                "a recurring interval R{count}/{start}/{step}",
            ));
        }

        let count: usize = parts[0]
            .trim()
            .parse()
            .map_err(|_| RiseError::invalid_filter("z", raw, "an integer count after 'R'"))?;
        if count == 0 || count > MAX_RECURRING_LEVELS {
            return Err(RiseError::invalid_filter(
                "z",
                raw,
                format!("a count between 1 and {}", MAX_RECURRING_LEVELS),
            ));
        }
        let start = parse_number("z", parts[1])?;
        let step = parse_number("z", parts[2])?;

        Ok(VerticalLevel::EnumeratedList(
            (0..count).map(|i| start + i as f64 * step).collect(),
        ))
    }

    /// Whether an elevation satisfies this level.
    pub fn matches(&self, elevation: f64) -> bool {
        match self {
            VerticalLevel::Range(lo, hi) => *lo <= elevation && elevation <= *hi,
            VerticalLevel::Single(v) => elevation == *v,
            VerticalLevel::EnumeratedList(values) => values.contains(&elevation),
        }
    }
}

/// Temporal filter on `updateDate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DateTimeQuery {
    /// Matched as a prefix of the raw `updateDate` text.
    Instant(String),

    /// Inclusive on both ends; `None` is open.
    Interval {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl DateTimeQuery {
    /// Parse a datetime parameter.
    ///
    /// Accepts formats:
    /// - Instant: `2020-01-01`, `2020-01-01T10:00:00Z`
    /// - Interval: `2020-01-01/2020-12-31`
    /// - Open start: `../2020-12-31`
    /// - Open end: `2020-01-01/..`
    pub fn parse(datetime: &str) -> RiseResult<Self> {
        let datetime = datetime.trim();
        let parts: Vec<&str> = datetime.split('/').collect();

        match parts.as_slice() {
            [instant] => {
                if instant.is_empty() {
                    return Err(RiseError::invalid_filter(
                        "datetime",
                        datetime,
                        "an ISO 8601 instant or interval",
                    ));
                }
                if parse_timestamp(instant).is_none() && !is_instant_prefix(instant) {
                    return Err(RiseError::invalid_filter(
                        "datetime",
                        datetime,
                        "an ISO 8601 instant",
                    ));
                }
                Ok(DateTimeQuery::Instant(instant.to_string()))
            }
            [start, end] => {
                let bound = |raw: &str| -> RiseResult<Option<DateTime<Utc>>> {
                    let raw = raw.trim();
                    if raw == ".." {
                        return Ok(None);
                    }
                    parse_timestamp(raw).map(Some).ok_or_else(|| {
                        RiseError::invalid_filter(
                            "datetime",
                            datetime,
                            "interval bounds that are ISO 8601 instants or '..'",
                        )
                    })
                };
                let start = bound(*start)?;
                let end = bound(*end)?;

                match (start, end) {
                    (None, None) => Err(RiseError::invalid_filter(
                        "datetime",
                        datetime,
                        "an interval with at least one closed end",
                    )),
                    (Some(s), Some(e)) if s > e => Err(RiseError::invalid_filter(
                        "datetime",
                        datetime,
                        "an interval whose start is not after its end",
                    )),
                    (start, end) => Ok(DateTimeQuery::Interval { start, end }),
                }
            }
            _ => Err(RiseError::invalid_filter(
                "datetime",
                datetime,
                "an instant or a single start/end interval",
            )),
        }
    }

    /// Whether a location's raw `updateDate` passes this filter.
    ///
    /// Interval matching parses the value; an unparsable date is an upstream
    /// problem, reported as [`RiseError::MalformedInput`].
    pub fn matches_update_date(&self, update_date: &str) -> RiseResult<bool> {
        match self {
            DateTimeQuery::Instant(prefix) => Ok(update_date.starts_with(prefix.as_str())),
            DateTimeQuery::Interval { start, end } => {
                let ts = parse_timestamp(update_date).ok_or_else(|| {
                    RiseError::malformed(format!("unparsable updateDate '{}'", update_date))
                })?;
                let after_start = start.map_or(true, |s| ts >= s);
                let before_end = end.map_or(true, |e| ts <= e);
                Ok(after_start && before_end)
            }
        }
    }
}

/// Reduced-precision instant: `YYYY[-MM[-DD[Thh[:mm[:ss]]]]]`.
fn is_instant_prefix(raw: &str) -> bool {
    fn field(part: &str, width: usize) -> Option<u32> {
        if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    }

    let (date, time) = match raw.split_once(['T', ' ']) {
        Some((date, time)) => (date, Some(time)),
        None => (raw, None),
    };

    let date: Vec<&str> = date.split('-').collect();
    let valid_date = match date.as_slice() {
        [y] => field(y, 4).is_some(),
        [y, m] => field(y, 4).is_some() && field(m, 2).map_or(false, |m| (1..=12).contains(&m)),
        [y, m, d] => match (field(y, 4), field(m, 2), field(d, 2)) {
            (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y as i32, m, d).is_some(),
            _ => false,
        },
        _ => false,
    };
    if !valid_date {
        return false;
    }

    let time = match time {
        Some(time) if date.len() == 3 => time,
        Some(_) => return false,
        None => return true,
    };
    let limits = [24, 60, 60];
    let parts: Vec<&str> = time.split(':').collect();
    !parts.is_empty()
        && parts.len() <= limits.len()
        && parts
            .iter()
            .zip(limits)
            .all(|(part, limit)| field(part, 2).map_or(false, |v| v < limit))
}

/// Lenient ISO 8601 parsing for upstream timestamps.
///
/// Accepts `T` or space separators, optional fractional seconds, `Z` or
/// `+HH`, `+HHMM`, `+HH:MM` offsets, and bare dates. Values without an offset
/// are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let mut normalized = raw.to_string();
    if normalized.len() > 10 && normalized.as_bytes()[10] == b' ' {
        normalized.replace_range(10..11, "T");
    }
    if normalized.ends_with('Z') || normalized.ends_with('z') {
        normalized.truncate(normalized.len() - 1);
        normalized.push_str("+00:00");
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One sort key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortSpec {
    pub property: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            order: SortOrder::Descending,
        }
    }

    /// Parse `+name,-name,name`. A bare name sorts ascending.
    pub fn parse_list(sortby: &str) -> RiseResult<Vec<Self>> {
        sortby
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|key| {
                let (order, name) = if let Some(name) = key.strip_prefix('-') {
                    (SortOrder::Descending, name)
                } else if let Some(name) = key.strip_prefix('+') {
                    (SortOrder::Ascending, name)
                } else {
                    (SortOrder::Ascending, key)
                };
                let name = name.trim();
                if name.is_empty() {
                    return Err(RiseError::invalid_filter(
                        "sortby",
                        sortby,
                        "property names optionally prefixed with '+' or '-'",
                    ));
                }
                Ok(SortSpec {
                    property: name.to_string(),
                    order,
                })
            })
            .collect()
    }
}

/// A `property=value` equality filter, value as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyFilter {
    pub name: String,
    pub value: String,
}

impl PropertyFilter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Collect `(name, value)` pairs into filters.
pub fn parse_property_filters<K, V>(pairs: &[(K, V)]) -> Vec<PropertyFilter>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .iter()
        .map(|(k, v)| PropertyFilter::new(k.as_ref(), v.as_ref()))
        .collect()
}
