//! The `!eval` mini-language: `"<integer> <operator> <integer>"`.
//!
//! Exactly one space separates the three parts and the operator is one of
//! `+ - * /`. Anything else is rejected. Operands are 32-bit signed integers
//! and arithmetic is checked, so overflow and division by zero come back as
//! errors.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("expected \"<number> <operator> <number>\"")]
    Malformed,
    #[error("'{0}' is not an integer")]
    InvalidOperand(String),
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result does not fit in a 32-bit integer")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl FromStr for Operator {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            other => Err(EvalError::UnknownOperator(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expression {
    pub lhs: i32,
    pub operator: Operator,
    pub rhs: i32,
}

impl FromStr for Expression {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(' ').collect();
        let [lhs, operator, rhs] = parts.as_slice() else {
            return Err(EvalError::Malformed);
        };

        Ok(Expression {
            lhs: parse_operand(lhs)?,
            operator: operator.parse()?,
            rhs: parse_operand(rhs)?,
        })
    }
}

impl Expression {
    pub fn evaluate(&self) -> Result<i32, EvalError> {
        let Expression { lhs, operator, rhs } = *self;
        match operator {
            Operator::Add => lhs.checked_add(rhs).ok_or(EvalError::Overflow),
            Operator::Subtract => lhs.checked_sub(rhs).ok_or(EvalError::Overflow),
            Operator::Multiply => lhs.checked_mul(rhs).ok_or(EvalError::Overflow),
            Operator::Divide if rhs == 0 => Err(EvalError::DivisionByZero),
            Operator::Divide => lhs.checked_div(rhs).ok_or(EvalError::Overflow),
        }
    }
}

/// Parses and evaluates `input` in one step.
pub fn evaluate(input: &str) -> Result<i32, EvalError> {
    input.parse::<Expression>()?.evaluate()
}

fn parse_operand(token: &str) -> Result<i32, EvalError> {
    token
        .parse()
        .map_err(|_| EvalError::InvalidOperand(token.to_string()))
}
