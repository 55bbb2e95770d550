//! Estimates today's check-out time from the user's past sessions.
//!
//! The estimate is the mean duration of past complete sessions added to
//! today's check-in time. Sessions that cross midnight are measured modulo
//! one day, which is unambiguous while sessions stay under the 12 hour cap.

use chrono::{Duration, NaiveTime};
use derive_more::Display;

pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// Not enough complete sessions to say anything useful.
    InsufficientData { complete_sessions: usize },
    Estimated {
        check_out: NaiveTime,
        typical_duration: Duration,
        complete_sessions: usize,
    },
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum PredictionError {
    #[display(fmt = "unparseable time of day {:?}", _0)]
    MalformedTime(String),
}

impl std::error::Error for PredictionError {}

fn parse_time(value: &str) -> Result<NaiveTime, PredictionError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| PredictionError::MalformedTime(value.to_string()))
}

fn session_length(check_in: NaiveTime, check_out: NaiveTime) -> Duration {
    let delta = check_out - check_in;
    if delta < Duration::zero() {
        delta + Duration::days(1)
    } else {
        delta
    }
}

/// `history` yields `(check_in, check_out)` pairs as stored (`HH:MM:SS`).
/// Pairs without a check-out are ignored.
pub fn predict<'a, I>(
    history: I,
    today_check_in: &str,
    min_sessions: usize,
) -> Result<Prediction, PredictionError>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let complete: Vec<(&str, &str)> = history
        .into_iter()
        .filter_map(|(check_in, check_out)| match check_out {
            Some(out) if !out.trim().is_empty() => Some((check_in, out)),
            _ => None,
        })
        .collect();

    if complete.len() < min_sessions.max(1) {
        return Ok(Prediction::InsufficientData {
            complete_sessions: complete.len(),
        });
    }

    let mut total_seconds: i64 = 0;
    for (check_in, check_out) in &complete {
        let length = session_length(parse_time(check_in)?, parse_time(check_out)?);
        total_seconds += length.num_seconds();
    }
    let typical_duration = Duration::seconds(total_seconds / complete.len() as i64);

    let start = parse_time(today_check_in)?;
    let (check_out, _) = start.overflowing_add_signed(typical_duration);

    Ok(Prediction::Estimated {
        check_out,
        typical_duration,
        complete_sessions: complete.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, TIME_FORMAT).unwrap()
    }

    #[test]
    fn two_sessions_are_not_enough() {
        let history = [("08:00:00", Some("16:00:00")), ("08:10:00", Some("16:30:00"))];
        assert_eq!(
            predict(history, "08:00:00", 3).unwrap(),
            Prediction::InsufficientData {
                complete_sessions: 2
            }
        );
    }

    #[test]
    fn incomplete_sessions_do_not_count() {
        let history = [
            ("08:00:00", Some("16:00:00")),
            ("08:00:00", None),
            ("08:00:00", Some("")),
            ("08:00:00", Some("17:00:00")),
        ];
        assert!(matches!(
            predict(history, "08:00:00", 3).unwrap(),
            Prediction::InsufficientData {
                complete_sessions: 2
            }
        ));
    }

    #[test]
    fn mean_duration_is_added_to_check_in() {
        let history = [
            ("08:00:00", Some("16:00:00")),
            ("07:30:00", Some("16:00:00")),
            ("09:00:00", Some("16:30:00")),
        ];
        match predict(history, "08:00:00", 3).unwrap() {
            Prediction::Estimated {
                check_out,
                typical_duration,
                complete_sessions,
            } => {
                assert_eq!(check_out, t("16:00:00"));
                assert_eq!(typical_duration, Duration::hours(8));
                assert_eq!(complete_sessions, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn later_check_in_shifts_prediction_equally() {
        let history = [
            ("08:00:00", Some("16:00:00")),
            ("08:00:00", Some("16:20:00")),
            ("08:00:00", Some("15:40:00")),
        ];
        let early = predict(history, "07:00:00", 3).unwrap();
        let late = predict(history, "09:15:00", 3).unwrap();
        match (early, late) {
            (
                Prediction::Estimated { check_out: a, .. },
                Prediction::Estimated { check_out: b, .. },
            ) => assert_eq!(b - a, Duration::minutes(135)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overnight_sessions_wrap_midnight() {
        let history = [
            ("22:00:00", Some("06:00:00")),
            ("22:00:00", Some("06:00:00")),
            ("22:00:00", Some("06:00:00")),
        ];
        match predict(history, "21:30:00", 3).unwrap() {
            Prediction::Estimated { check_out, .. } => assert_eq!(check_out, t("05:30:00")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_history_is_an_error() {
        let history = [
            ("08:00:00", Some("16:00:00")),
            ("8 o'clock", Some("16:00:00")),
            ("08:00:00", Some("16:00:00")),
        ];
        assert!(matches!(
            predict(history, "08:00:00", 3),
            Err(PredictionError::MalformedTime(_))
        ));
    }
}
