pub mod spl_token;
pub mod token_metadata;

use solana_pubkey::Pubkey;

use crate::error::Error;

pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const TOKEN_METADATA_PROGRAM_ID: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Program {
    Token,
    Token2022,
    TokenMetadata,
}

impl Program {
    pub fn all() -> [Self; 3] {
        [Self::Token, Self::Token2022, Self::TokenMetadata]
    }

    pub fn program_id_str(self) -> &'static str {
        match self {
            Self::Token => TOKEN_PROGRAM_ID,
            Self::Token2022 => TOKEN_2022_PROGRAM_ID,
            Self::TokenMetadata => TOKEN_METADATA_PROGRAM_ID,
        }
    }

    pub fn program_id(self) -> Pubkey {
        Pubkey::from_str_const(self.program_id_str())
    }

    pub fn from_program_id(program_id: &Pubkey) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|program| program.program_id() == *program_id)
    }
}

/// Fails with [`Error::Construction`] unless `program_id` is one of `accepted`.
pub(crate) fn require_program(
    builder: &str,
    program_id: &Pubkey,
    accepted: &[Program],
) -> Result<Program, Error> {
    let found = Program::from_program_id(program_id);
    match found {
        Some(program) if accepted.contains(&program) => Ok(program),
        _ => {
            let expected: Vec<String> = accepted.iter().map(ToString::to_string).collect();
            let actual = match found {
                Some(program) => format!("{program} ({program_id})"),
                None => program_id.to_string(),
            };
            Err(Error::Construction {
                reason: format!(
                    "{builder} cannot query program {actual}, expected one of: {}",
                    expected.join(", ")
                ),
            })
        }
    }
}

#[cfg(test)]
#[expect(clippy::panic, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn program_ids_resolve_both_ways() {
        for program in Program::all() {
            assert_eq!(program.program_id().to_string(), program.program_id_str());
            assert_eq!(
                Program::from_program_id(&program.program_id()),
                Some(program)
            );
        }
        assert_eq!(
            Program::from_program_id(&Pubkey::new_from_array([0; 32])),
            None
        );
    }

    #[test]
    fn require_program_names_the_builder() {
        let system = Pubkey::new_from_array([0; 32]);
        let err = require_program("MetadataQuery", &system, &[Program::TokenMetadata]);
        assert!(matches!(
            err,
            Err(Error::Construction { ref reason }) if reason.contains("MetadataQuery")
        ));

        let token = Program::Token.program_id();
        assert!(require_program("TokenAccountQuery", &token, &[Program::Token]).is_ok());
        assert!(require_program("MetadataQuery", &token, &[Program::TokenMetadata]).is_err());
    }

    #[test]
    fn construction_error_names_found_and_expected_programs() {
        let metadata = Program::TokenMetadata.program_id();
        let err = require_program(
            "TokenAccountQuery",
            &metadata,
            &[Program::Token, Program::Token2022],
        );
        match err {
            Err(Error::Construction { reason }) => {
                let found = format!("token_metadata ({TOKEN_METADATA_PROGRAM_ID})");
                assert!(reason.contains(&found));
                assert!(reason.contains("expected one of: token, "));
            }
            other => panic!("expected construction error, got {other:?}"),
        }
    }
}
