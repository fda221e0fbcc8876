//! Closed registry of computation tasks.
//!
//! A request names a task by number; [`dispatch`] decodes the request input
//! into the shape that task declares, runs the handler and encodes the result.
//! The set of tasks is fixed at compile time.

mod handlers;

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DispatchError;

/// The input shape a task expects its payload to decode into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    Strings,
    Integers,
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strings => f.write_str("an array of strings"),
            Self::Integers => f.write_str("an array of integers"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Column-wise transpose of equal-length words.
    Transpose,
    /// Count of words whose digits form a perfect square.
    PerfectSquares,
    /// Sum of the digit-reversed integers.
    ReversedSum,
    /// Average of integers whose digit sum falls inside leading bounds.
    DigitSumAverage,
    /// Decimal values of the tokens that parse as binary.
    BinaryValues,
    /// Caesar shift of lowercase letters.
    CaesarShift,
}

impl Task {
    pub const ALL: [Task; 6] = [
        Self::Transpose,
        Self::PerfectSquares,
        Self::ReversedSum,
        Self::DigitSumAverage,
        Self::BinaryValues,
        Self::CaesarShift,
    ];

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Transpose),
            2 => Some(Self::PerfectSquares),
            3 => Some(Self::ReversedSum),
            4 => Some(Self::DigitSumAverage),
            5 => Some(Self::BinaryValues),
            6 => Some(Self::CaesarShift),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::Transpose => 1,
            Self::PerfectSquares => 2,
            Self::ReversedSum => 3,
            Self::DigitSumAverage => 4,
            Self::BinaryValues => 5,
            Self::CaesarShift => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Transpose => "transpose",
            Self::PerfectSquares => "perfect-squares",
            Self::ReversedSum => "reversed-sum",
            Self::DigitSumAverage => "digit-sum-average",
            Self::BinaryValues => "binary-values",
            Self::CaesarShift => "caesar-shift",
        }
    }

    pub fn input_shape(self) -> InputShape {
        match self {
            Self::ReversedSum | Self::DigitSumAverage => InputShape::Integers,
            Self::Transpose | Self::PerfectSquares | Self::BinaryValues | Self::CaesarShift => {
                InputShape::Strings
            }
        }
    }

    /// Run this task against a raw JSON payload.
    pub fn run(self, input: Value) -> Result<Value, DispatchError> {
        match self {
            Self::Transpose => {
                let words: Vec<String> = self.decode(input)?;
                encode(handlers::transpose(&words)?)
            }
            Self::PerfectSquares => {
                let words: Vec<String> = self.decode(input)?;
                encode(handlers::count_perfect_squares(&words))
            }
            Self::ReversedSum => {
                let numbers: Vec<i64> = self.decode(input)?;
                encode(handlers::reversed_sum(&numbers)?)
            }
            Self::DigitSumAverage => {
                let numbers: Vec<i64> = self.decode(input)?;
                encode(handlers::digit_sum_average(&numbers)?)
            }
            Self::BinaryValues => {
                let tokens: Vec<String> = self.decode(input)?;
                encode(handlers::binary_values(&tokens))
            }
            Self::CaesarShift => {
                let args: Vec<String> = self.decode(input)?;
                encode(handlers::caesar_shift(&args)?)
            }
        }
    }

    fn decode<T: DeserializeOwned>(self, input: Value) -> Result<T, DispatchError> {
        serde_json::from_value(input).map_err(|source| DispatchError::InvalidInput {
            task: self,
            expected: self.input_shape(),
            source,
        })
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.id(), self.name())
    }
}

/// Look up `task_id` and run it against `input`.
pub fn dispatch(task_id: i64, input: Value) -> Result<Value, DispatchError> {
    let task = Task::from_id(task_id).ok_or(DispatchError::UnknownTask(task_id))?;
    task.run(input)
}

fn encode(result: impl Serialize) -> Result<Value, DispatchError> {
    serde_json::to_value(result).map_err(DispatchError::Encode)
}
