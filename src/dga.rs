//! Synthetic domain-generation-algorithm names.
//!
//! Two primitives are exposed: a character-random label and a label built
//! from a curated seed fragment plus a numeric suffix. Callers decide how
//! to mix them.

use rand::seq::SliceRandom;
use rand::Rng;

/// Low-reputation TLDs appended to every synthesized label
pub const DGA_TLDS: &[&str] = &[
	"tk", "ml", "ga", "cf", "gq", "xyz", "top", "club", "online", "site",
];

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

// Consonant/vowel runs and hex-looking chunks seen in real DGA families
pub(crate) const SEED_FRAGMENTS: &[&str] = &[
	"qwrtzp",
	"xkvbnm",
	"zxcvbq",
	"bakumo",
	"tirelo",
	"voxuna",
	"pelira",
	"a3f9c2",
	"d41d8c",
	"e3b0c4",
	"7fa2b9",
	"c0ffee",
	"deadbe",
];

pub const RANDOM_LABEL_MIN: usize = 8;
pub const RANDOM_LABEL_MAX: usize = 15;

/// Label of 8..=15 characters drawn uniformly from `[a-z0-9]`.
pub fn random_label<R: Rng + ?Sized>(rng: &mut R) -> String {
	let len = rng.gen_range(RANDOM_LABEL_MIN..=RANDOM_LABEL_MAX);
	(0..len)
		.map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
		.collect()
}

/// Label made of one seed fragment followed by a random number.
pub fn pattern_label<R: Rng + ?Sized>(rng: &mut R) -> String {
	let fragment = SEED_FRAGMENTS.choose(rng).copied().unwrap_or("qwrtzp");
	let suffix: u32 = rng.gen_range(0..10_000);
	format!("{}{}", fragment, suffix)
}

/// Pick a TLD uniformly from the low-reputation list.
pub fn random_tld<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
	DGA_TLDS.choose(rng).copied().unwrap_or("xyz")
}

/// Join a label with a random TLD.
pub fn with_tld<R: Rng + ?Sized>(label: &str, rng: &mut R) -> String {
	format!("{}.{}", label, random_tld(rng))
}

/// Check that a name is a single lowercase label followed by one of the
/// DGA TLDs.
pub fn is_dga_hostname(name: &str) -> bool {
	let Some((label, tld)) = name.split_once('.') else {
		return false;
	};
	is_valid_label(label) && DGA_TLDS.contains(&tld)
}

/// RFC 1123 label check restricted to lowercase ASCII.
pub fn is_valid_label(label: &str) -> bool {
	!label.is_empty()
		&& label.len() <= 63
		&& !label.starts_with('-')
		&& !label.ends_with('-')
		&& label.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	#[test]
	fn test_random_label_length_and_charset() {
		let mut rng = StdRng::seed_from_u64(99);
		for _ in 0..1000 {
			let label = random_label(&mut rng);
			assert!(
				(RANDOM_LABEL_MIN..=RANDOM_LABEL_MAX).contains(&label.len()),
				"bad length: {}", label,
			);
			assert!(
				label.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()),
				"bad charset: {}", label,
			);
		}
	}

	#[test]
	fn test_random_label_covers_length_range() {
		let mut rng = StdRng::seed_from_u64(4);
		let mut seen = [false; RANDOM_LABEL_MAX + 1];
		for _ in 0..2000 {
			seen[random_label(&mut rng).len()] = true;
		}
		for len in RANDOM_LABEL_MIN..=RANDOM_LABEL_MAX {
			assert!(seen[len], "length {} never produced", len);
		}
	}

	#[test]
	fn test_pattern_label_is_valid() {
		let mut rng = StdRng::seed_from_u64(17);
		for _ in 0..500 {
			let label = pattern_label(&mut rng);
			assert!(is_valid_label(&label), "invalid label: {}", label);
			assert!(SEED_FRAGMENTS.iter().any(|f| label.starts_with(f)));
		}
	}

	#[test]
	fn test_with_tld_produces_dga_hostname() {
		let mut rng = StdRng::seed_from_u64(23);
		for _ in 0..200 {
			let name = with_tld(&random_label(&mut rng), &mut rng);
			assert!(is_dga_hostname(&name), "not a DGA hostname: {}", name);
		}
	}

	#[test]
	fn test_is_dga_hostname_rejects() {
		assert!(!is_dga_hostname("google.com"));
		assert!(!is_dga_hostname("abc"));
		assert!(!is_dga_hostname("-abc.tk"));
		assert!(!is_dga_hostname("ABCdef.tk"));
		assert!(!is_dga_hostname("a.b.tk"));
		assert!(is_dga_hostname("a3f9c21234.online"));
	}
}
