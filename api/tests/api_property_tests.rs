// Property-based tests for the API building blocks: pagination math,
// link building, verification codes and token round-trips

use common::auth::{generate_verification_code, JwtService};
use common::pagination::Paginator;
use proptest::prelude::*;

// For any page size and row count, the page count must cover every row
// exactly: enough pages to hold the rows, and no fully empty trailing page.
#[test]
fn property_page_count_covers_all_rows() {
    proptest!(|(
        per_page in 1..100u32,
        count in 0..10_000i64,
    )| {
        let paginator = Paginator::new(per_page);
        let num_pages = paginator.num_pages(count);

        prop_assert!(num_pages >= 1, "There is always at least one page");
        prop_assert!(
            num_pages * per_page as i64 >= count,
            "All rows must fit: {} pages x {} < {}", num_pages, per_page, count
        );
        if count > per_page as i64 {
            prop_assert!(
                (num_pages - 1) * (per_page as i64) < count,
                "The last page may not be empty"
            );
        }
    });
}

// For any valid page, the offset stays inside the row range and successive
// pages advance by exactly one page size.
#[test]
fn property_offsets_are_dense_and_in_range() {
    proptest!(|(
        per_page in 1..100u32,
        count in 1..10_000i64,
    )| {
        let paginator = Paginator::new(per_page);
        let num_pages = paginator.num_pages(count);

        for page in 1..=num_pages {
            prop_assert!(paginator.validate(page, count).is_ok());
            let offset = paginator.offset(page);
            prop_assert!(offset >= 0);
            prop_assert!(offset < count, "Offset {} out of range for {} rows", offset, count);
        }
        prop_assert_eq!(paginator.offset(2) - paginator.offset(1), per_page as i64);
    });
}

// Pages outside [1, num_pages] are always rejected.
#[test]
fn property_invalid_pages_rejected() {
    proptest!(|(
        per_page in 1..100u32,
        count in 0..10_000i64,
        beyond in 1..50i64,
    )| {
        let paginator = Paginator::new(per_page);
        let num_pages = paginator.num_pages(count);

        prop_assert!(paginator.validate(0, count).is_err());
        prop_assert!(paginator.validate(-beyond, count).is_err());
        prop_assert!(paginator.validate(num_pages + beyond, count).is_err());
    });
}

// Link invariants: no previous on the first page, no next on the last,
// both in the middle, and the targets point one page away.
#[test]
fn property_page_links_point_one_page_away() {
    proptest!(|(
        per_page in 1..50u32,
        count in 0..5_000i64,
    )| {
        let paginator = Paginator::new(per_page);
        let num_pages = paginator.num_pages(count);
        let site = "http://127.0.0.1:8888";

        for page in 1..=num_pages {
            let (previous, next) = paginator.links(site, "/api/posts", page, count);

            prop_assert_eq!(previous.is_none(), page == 1);
            prop_assert_eq!(next.is_none(), page == num_pages);

            if let Some(prev) = previous {
                prop_assert!(prev.ends_with(&format!("?page={}", page - 1)), "previous link targets one page back");
                prop_assert!(prev.starts_with(site));
            }
            if let Some(next) = next {
                prop_assert!(next.ends_with(&format!("?page={}", page + 1)), "next link targets one page forward");
                prop_assert!(next.starts_with(site));
            }
        }
    });
}

// The envelope always reports the requested slice consistently.
#[test]
fn property_page_envelope_is_consistent() {
    proptest!(|(
        per_page in 1..50u32,
        count in 0..5_000i64,
        page_seed in 0..100i64,
    )| {
        let paginator = Paginator::new(per_page);
        let num_pages = paginator.num_pages(count);
        let page = 1 + page_seed % num_pages;

        let results: Vec<i64> = Vec::new();
        let envelope = paginator.page("http://s", "/api/categories", page, count, results);

        prop_assert_eq!(envelope.count, count);
        prop_assert_eq!(envelope.num_pages, num_pages);
        prop_assert_eq!(envelope.previous.is_none(), page == 1);
        prop_assert_eq!(envelope.next.is_none(), page == num_pages);
    });
}

// Verification codes are always numeric and of the requested length.
#[test]
fn property_verification_codes_are_numeric() {
    proptest!(|(length in 1..12u32)| {
        let code = generate_verification_code(length);
        prop_assert_eq!(code.len(), length as usize);
        prop_assert!(code.chars().all(|c| c.is_ascii_digit()));
    });
}

// Any issued token decodes back to the same subject and username
// under the same secret.
#[test]
fn property_token_round_trip() {
    proptest!(|(
        user_id in 1..1_000_000i64,
        username in "[a-z0-9.@_-]{3,40}",
        secret in "[A-Za-z0-9]{16,48}",
    )| {
        let service = JwtService::new(&secret, 24);

        let token = service
            .encode_token(user_id, &username)
            .expect("Failed to encode token");
        let claims = service.decode_token(&token).expect("Failed to decode token");

        prop_assert_eq!(claims.sub, user_id.to_string());
        prop_assert_eq!(claims.username, username);
        prop_assert!(claims.exp > claims.iat);
    });
}

// A token never validates under a different secret.
#[test]
fn property_token_bound_to_secret() {
    proptest!(|(
        user_id in 1..1_000_000i64,
        secret_a in "[a-z]{16,32}",
        suffix in "[0-9]{1,8}",
    )| {
        let issuer = JwtService::new(&secret_a, 24);
        let verifier = JwtService::new(&format!("{}{}", secret_a, suffix), 24);

        let token = issuer
            .encode_token(user_id, "someone")
            .expect("Failed to encode token");
        prop_assert!(verifier.decode_token(&token).is_err());
    });
}
