use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The three program tracks a session can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    #[serde(rename = "BSc")]
    Bsc,
    #[serde(rename = "BCA")]
    Bca,
    #[serde(rename = "MSc")]
    Msc,
}

impl Department {
    pub const ALL: [Department; 3] = [Department::Bsc, Department::Bca, Department::Msc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Bsc => "BSc",
            Department::Bca => "BCA",
            Department::Msc => "MSc",
        }
    }

    pub fn program(&self) -> ProgramDefinition {
        match self {
            Department::Bsc => ProgramDefinition {
                years: 3,
                semesters_per_year: 2,
            },
            Department::Bca => ProgramDefinition {
                years: 3,
                semesters_per_year: 2,
            },
            Department::Msc => ProgramDefinition {
                years: 2,
                semesters_per_year: 2,
            },
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Department::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "unknown department '{}' (expected one of BSc, BCA, MSc)",
                    wanted
                ))
            })
    }
}

/// Fixed (years x semesters) shape of a program track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramDefinition {
    pub years: u32,
    pub semesters_per_year: u32,
}

impl ProgramDefinition {
    pub fn final_year(&self) -> u32 {
        self.years
    }

    pub fn validate_position(&self, pos: Position) -> AppResult<()> {
        if pos.year < 1 || pos.year > self.years {
            return Err(AppError::validation(format!(
                "year {} out of range 1..={}",
                pos.year, self.years
            )));
        }
        if pos.semester < 1 || pos.semester > self.semesters_per_year {
            return Err(AppError::validation(format!(
                "semester {} out of range 1..={}",
                pos.semester, self.semesters_per_year
            )));
        }
        Ok(())
    }

    /// A student anywhere in the final year is due to graduate.
    pub fn is_final_year(&self, pos: Position) -> bool {
        pos.year == self.final_year()
    }
}

/// A (year, semester) point in a program, ordered year first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub year: u32,
    pub semester: u32,
}

impl Position {
    pub fn new(year: u32, semester: u32) -> Self {
        Self { year, semester }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.semester).cmp(&(other.year, other.semester))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_parse_is_case_insensitive() {
        assert_eq!("bsc".parse::<Department>().unwrap(), Department::Bsc);
        assert_eq!(" BCA ".parse::<Department>().unwrap(), Department::Bca);
        assert_eq!("MSc".parse::<Department>().unwrap(), Department::Msc);
        let e = "BA".parse::<Department>().unwrap_err();
        assert_eq!(e.code(), "validation_error");
    }

    #[test]
    fn department_serde_uses_display_names() {
        assert_eq!(serde_json::to_string(&Department::Bca).unwrap(), "\"BCA\"");
        let d: Department = serde_json::from_str("\"MSc\"").unwrap();
        assert_eq!(d, Department::Msc);
    }

    #[test]
    fn positions_validate_against_program_shape() {
        let p = Department::Msc.program();
        assert!(p.validate_position(Position::new(1, 1)).is_ok());
        assert!(p.validate_position(Position::new(2, 2)).is_ok());
        assert!(p.validate_position(Position::new(3, 1)).is_err());
        assert!(p.validate_position(Position::new(0, 1)).is_err());
        assert!(p.validate_position(Position::new(1, 3)).is_err());
    }

    #[test]
    fn final_year_covers_every_semester_of_it() {
        let p = Department::Bsc.program();
        assert_eq!(p.final_year(), 3);
        assert!(p.is_final_year(Position::new(3, 1)));
        assert!(p.is_final_year(Position::new(3, 2)));
        assert!(!p.is_final_year(Position::new(2, 2)));
        assert!(Department::Msc.program().is_final_year(Position::new(2, 1)));
        assert!(Position::new(1, 2) < Position::new(2, 1));
        assert!(Position::new(2, 1) < Position::new(2, 2));
    }
}
