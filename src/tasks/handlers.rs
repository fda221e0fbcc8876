//! Pure task implementations. Inputs are already decoded into their declared shape.

use crate::error::DispatchError;

use super::Task;

/// `output[i]` is the `i`-th character of every word, in input order.
pub(super) fn transpose(words: &[String]) -> Result<Vec<String>, DispatchError> {
    let columns: Vec<Vec<char>> = words.iter().map(|w| w.chars().collect()).collect();
    let Some(width) = columns.first().map(Vec::len) else {
        return Ok(Vec::new());
    };

    if columns.iter().any(|c| c.len() != width) {
        return Err(DispatchError::invalid(
            Task::Transpose,
            "all words must have the same length",
        ));
    }

    Ok((0..width)
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect())
}

/// Counts words whose digits, read in order, form a perfect square.
///
/// Every numeric character is collected, not just `0`..=`9`. A word holding a
/// non-ASCII digit then fails to parse and is not counted.
pub(super) fn count_perfect_squares(words: &[String]) -> usize {
    words
        .iter()
        .filter_map(|word| {
            let digits: String = word.chars().filter(|c| c.is_numeric()).collect();
            // Digit runs too long for u64 are skipped like any other non-number.
            digits.parse::<u64>().ok()
        })
        .filter(|&n| is_perfect_square(n))
        .count()
}

fn is_perfect_square(n: u64) -> bool {
    let root = n.isqrt();
    root * root == n
}

pub(super) fn reversed_sum(numbers: &[i64]) -> Result<i64, DispatchError> {
    numbers.iter().try_fold(0i64, |sum, &n| {
        reverse_digits(n)
            .and_then(|r| sum.checked_add(r))
            .ok_or(DispatchError::Overflow(Task::ReversedSum))
    })
}

/// `-120` becomes `-21`.
fn reverse_digits(n: i64) -> Option<i64> {
    let mut rest = n.unsigned_abs();
    let mut reversed: u64 = 0;
    while rest > 0 {
        reversed = reversed.checked_mul(10)?.checked_add(rest % 10)?;
        rest /= 10;
    }
    let reversed = i64::try_from(reversed).ok()?;
    Some(if n < 0 { -reversed } else { reversed })
}

/// `[min, max, skipped, values...]`: truncated average of the values whose
/// digit sum lies in `min..=max`, or 0 when none qualify.
pub(super) fn digit_sum_average(numbers: &[i64]) -> Result<i64, DispatchError> {
    let [min, max, _, values @ ..] = numbers else {
        return Err(DispatchError::invalid(
            Task::DigitSumAverage,
            format!("expected at least 3 integers, got {}", numbers.len()),
        ));
    };

    let mut sum: i64 = 0;
    let mut count: i64 = 0;
    for &value in values {
        if (*min..=*max).contains(&digit_sum(value)) {
            sum = sum
                .checked_add(value)
                .ok_or(DispatchError::Overflow(Task::DigitSumAverage))?;
            count += 1;
        }
    }

    Ok(if count > 0 { sum / count } else { 0 })
}

fn digit_sum(n: i64) -> i64 {
    let mut rest = n.unsigned_abs();
    let mut sum = 0;
    while rest > 0 {
        sum += (rest % 10) as i64;
        rest /= 10;
    }
    sum
}

/// Tokens that are not base-2 literals are dropped silently.
pub(super) fn binary_values(tokens: &[String]) -> Vec<i64> {
    tokens
        .iter()
        .filter_map(|t| i64::from_str_radix(t, 2).ok())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftDirection {
    Left,
    Right,
}

impl ShiftDirection {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            _ => None,
        }
    }
}

/// `[direction, steps, words...]`. Only `a..=z` is shifted; every other
/// character is copied through unchanged.
pub(super) fn caesar_shift(args: &[String]) -> Result<Vec<String>, DispatchError> {
    let [direction, steps, words @ ..] = args else {
        return Err(DispatchError::invalid(
            Task::CaesarShift,
            "expected a direction and a step count",
        ));
    };

    let direction = ShiftDirection::parse(direction).ok_or_else(|| {
        DispatchError::invalid(
            Task::CaesarShift,
            format!("direction must be LEFT or RIGHT, got {direction:?}"),
        )
    })?;
    let steps: i64 = steps.parse().map_err(|_| {
        DispatchError::invalid(
            Task::CaesarShift,
            format!("step count must be an integer, got {steps:?}"),
        )
    })?;

    let forward = steps.rem_euclid(26) as u8;
    let offset = match direction {
        ShiftDirection::Right => forward,
        ShiftDirection::Left => (26 - forward) % 26,
    };

    Ok(words
        .iter()
        .map(|word| word.chars().map(|c| shift_char(c, offset)).collect())
        .collect())
}

fn shift_char(c: char, offset: u8) -> char {
    if c.is_ascii_lowercase() {
        (b'a' + (c as u8 - b'a' + offset) % 26) as char
    } else {
        c
    }
}
