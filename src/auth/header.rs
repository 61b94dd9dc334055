// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `Authorization` header parsing.

use axum::http::HeaderValue;

use super::error::AuthError;

/// Extract the raw Bearer token from an `Authorization` header value.
///
/// Only the structure is checked here: two whitespace-separated words, the
/// first equal to `bearer` in any case, the second made of exactly three
/// dot-separated segments.
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let value = header.to_str().map_err(|_| AuthError::MalformedHeader)?;

    let mut parts = value.split_whitespace();
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::MalformedHeader);
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::WrongScheme);
    }

    if token.split('.').count() != 3 {
        return Err(AuthError::MalformedToken);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: &str) -> Result<String, AuthError> {
        let header = HeaderValue::from_str(value).unwrap();
        bearer_token(Some(&header)).map(str::to_string)
    }

    #[test]
    fn missing_header() {
        assert_eq!(bearer_token(None), Err(AuthError::MissingHeader));
    }

    #[test]
    fn wrong_part_count_is_malformed() {
        assert_eq!(parse("Bearer"), Err(AuthError::MalformedHeader));
        assert_eq!(parse("a b c"), Err(AuthError::MalformedHeader));
        assert_eq!(parse(""), Err(AuthError::MalformedHeader));
    }

    #[test]
    fn foreign_scheme_is_rejected() {
        assert_eq!(parse("Basic xyz"), Err(AuthError::WrongScheme));
    }

    #[test]
    fn token_must_have_three_segments() {
        assert_eq!(parse("Bearer abc.def"), Err(AuthError::MalformedToken));
        assert_eq!(parse("Bearer a.b.c.d"), Err(AuthError::MalformedToken));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(parse("bearer a.b.c"), Ok("a.b.c".to_string()));
        assert_eq!(parse("BEARER a.b.c"), Ok("a.b.c".to_string()));
    }

    #[test]
    fn non_ascii_header_is_malformed() {
        let header = HeaderValue::from_bytes(b"Bearer \xfa.b.c").unwrap();
        assert_eq!(bearer_token(Some(&header)), Err(AuthError::MalformedHeader));
    }
}
