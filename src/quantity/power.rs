use std::{
    fmt::{Display, Formatter},
    ops::{Div, Mul},
};

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    PartialOrd,
    serde::Serialize,
    serde::Deserialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Neg,
    derive_more::Sub,
    derive_more::Sum,
)]
pub struct Kilowatts(pub f64);

impl Display for Kilowatts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} kW", self.0)
    }
}

impl Mul<f64> for Kilowatts {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Kilowatts> for Kilowatts {
    type Output = f64;

    fn div(self, rhs: Kilowatts) -> Self::Output {
        self.0 / rhs.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Kilowatts(1.235).to_string(), "1.24 kW");
    }

    #[test]
    fn test_ratio() {
        assert_abs_diff_eq!(Kilowatts(9.0) / Kilowatts(100.0), 0.09);
    }
}
