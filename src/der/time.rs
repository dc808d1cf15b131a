use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{Result, TrustKitError};

/// Parse UTCTime content: `YYMMDDHHMM[SS](Z|+hhmm|-hhmm)`.
/// Two-digit years below 50 are 20xx, the rest 19xx.
pub(crate) fn parse_utc_time(content: &[u8]) -> Result<OffsetDateTime> {
    let s = ascii(content, "UTCTime")?;
    if s.len() < 11 {
        return Err(bad_time("UTCTime", s));
    }
    let yy = digits(s, 0, 2)?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    parse_from(s, year as i32, 2, "UTCTime")
}

/// Parse GeneralizedTime content:
/// `YYYYMMDDHHMM[SS[.fff]](Z|+hhmm|-hhmm)`.
pub(crate) fn parse_generalized_time(content: &[u8]) -> Result<OffsetDateTime> {
    let s = ascii(content, "GeneralizedTime")?;
    if s.len() < 13 {
        return Err(bad_time("GeneralizedTime", s));
    }
    let year = digits(s, 0, 4)?;
    parse_from(s, year as i32, 4, "GeneralizedTime")
}

fn parse_from(s: &str, year: i32, mut pos: usize, kind: &str) -> Result<OffsetDateTime> {
    let month = digits(s, pos, 2)?;
    let day = digits(s, pos + 2, 2)?;
    let hour = digits(s, pos + 4, 2)?;
    let minute = digits(s, pos + 6, 2)?;
    pos += 8;

    let bytes = s.as_bytes();
    let mut second = 0;
    if bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        second = digits(s, pos, 2)?;
        pos += 2;
    }
    let mut nanos = 0u32;
    if matches!(bytes.get(pos), Some(b'.' | b',')) {
        pos += 1;
        let start = pos;
        while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
        if pos == start {
            return Err(bad_time(kind, s));
        }
        let frac = &s[start..pos.min(start + 9)];
        let scale = 10u32.pow(9 - frac.len() as u32);
        nanos = frac.parse::<u32>().map_err(|_| bad_time(kind, s))? * scale;
    }

    let offset = match bytes.get(pos) {
        Some(b'Z') if pos + 1 == s.len() => UtcOffset::UTC,
        Some(sign @ (b'+' | b'-')) if pos + 5 == s.len() => {
            let h = digits(s, pos + 1, 2)? as i8;
            let m = digits(s, pos + 3, 2)? as i8;
            let (h, m) = if *sign == b'-' { (-h, -m) } else { (h, m) };
            UtcOffset::from_hms(h, m, 0).map_err(|_| bad_time(kind, s))?
        }
        _ => return Err(bad_time(kind, s)),
    };

    let month = Month::try_from(month as u8).map_err(|_| bad_time(kind, s))?;
    let date =
        Date::from_calendar_date(year, month, day as u8).map_err(|_| bad_time(kind, s))?;
    let time = Time::from_hms_nano(hour as u8, minute as u8, second as u8, nanos)
        .map_err(|_| bad_time(kind, s))?;
    Ok(PrimitiveDateTime::new(date, time)
        .assume_offset(offset)
        .to_offset(UtcOffset::UTC))
}

/// Format as UTCTime content `YYMMDDHHMMSSZ`. Only years 1950 to 2049 fit.
pub(crate) fn format_utc_time(t: OffsetDateTime) -> Result<String> {
    let t = t.to_offset(UtcOffset::UTC);
    if !(1950..2050).contains(&t.year()) {
        return Err(TrustKitError::EncodingError(format!(
            "year {} cannot be encoded as UTCTime",
            t.year()
        )));
    }
    Ok(format!(
        "{:02}{:02}{:02}{:02}{:02}{:02}Z",
        t.year() % 100,
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    ))
}

/// Format as GeneralizedTime content `YYYYMMDDHHMMSSZ`; fractional seconds
/// are dropped.
pub(crate) fn format_generalized_time(t: OffsetDateTime) -> Result<String> {
    let t = t.to_offset(UtcOffset::UTC);
    if !(0..=9999).contains(&t.year()) {
        return Err(TrustKitError::EncodingError(format!(
            "year {} cannot be encoded as GeneralizedTime",
            t.year()
        )));
    }
    Ok(format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}Z",
        t.year(),
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    ))
}

fn ascii<'a>(content: &'a [u8], kind: &str) -> Result<&'a str> {
    std::str::from_utf8(content)
        .ok()
        .filter(|s| s.is_ascii())
        .ok_or_else(|| TrustKitError::malformed(format!("{kind} is not ASCII")))
}

fn digits(s: &str, pos: usize, len: usize) -> Result<u32> {
    let part = s
        .get(pos..pos + len)
        .filter(|p| p.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| TrustKitError::malformed(format!("invalid time string {s}")))?;
    part.parse()
        .map_err(|_| TrustKitError::malformed(format!("invalid time string {s}")))
}

fn bad_time(kind: &str, s: &str) -> TrustKitError {
    TrustKitError::malformed(format!("invalid {kind} {s}"))
}
