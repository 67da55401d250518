use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Category tag attached to every generated query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainCategory {
	Popular,
	Business,
	Tech,
	Cdn,
	Suspicious,
	Malware,
	Blocked,
	Dga,
}

impl DomainCategory {
	pub const ALL: [DomainCategory; 8] = [
		DomainCategory::Popular,
		DomainCategory::Business,
		DomainCategory::Tech,
		DomainCategory::Cdn,
		DomainCategory::Suspicious,
		DomainCategory::Malware,
		DomainCategory::Blocked,
		DomainCategory::Dga,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			DomainCategory::Popular => "popular",
			DomainCategory::Business => "business",
			DomainCategory::Tech => "tech",
			DomainCategory::Cdn => "cdn",
			DomainCategory::Suspicious => "suspicious",
			DomainCategory::Malware => "malware",
			DomainCategory::Blocked => "blocked",
			DomainCategory::Dga => "dga",
		}
	}

	/// True for categories whose names come from the DGA synthesizer
	/// instead of the static corpus.
	pub fn is_synthesized(&self) -> bool {
		matches!(self, DomainCategory::Dga)
	}
}

impl fmt::Display for DomainCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A corpus member: a fixed domain name and the category it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainRecord {
	pub name: &'static str,
	pub category: DomainCategory,
}

const POPULAR: &[&str] = &[
	"google.com",
	"youtube.com",
	"facebook.com",
	"twitter.com",
	"instagram.com",
	"reddit.com",
	"amazon.com",
	"wikipedia.org",
	"netflix.com",
	"spotify.com",
	"apple.com",
	"microsoft.com",
	"bbc.com",
	"cnn.com",
	"nytimes.com",
	"theguardian.com",
	"weather.com",
	"maps.google.com",
];

const BUSINESS: &[&str] = &[
	"linkedin.com",
	"salesforce.com",
	"slack.com",
	"zoom.us",
	"dropbox.com",
	"outlook.com",
	"office.com",
	"teams.microsoft.com",
	"onedrive.com",
	"docs.google.com",
	"drive.google.com",
	"adobe.com",
	"oracle.com",
	"ibm.com",
	"cisco.com",
];

const TECH: &[&str] = &[
	"github.com",
	"stackoverflow.com",
	"docker.com",
	"kubernetes.io",
	"terraform.io",
	"ansible.com",
	"python.org",
	"nodejs.org",
	"golang.org",
	"rust-lang.org",
	"crates.io",
	"vmware.com",
	"nvidia.com",
	"intel.com",
	"amd.com",
];

const CDN: &[&str] = &[
	"cdn.jsdelivr.net",
	"cdnjs.cloudflare.com",
	"unpkg.com",
	"ajax.googleapis.com",
	"fonts.googleapis.com",
	"fonts.gstatic.com",
	"cloudflare.com",
	"akamai.net",
	"fastly.net",
	"cloudfront.net",
	"azureedge.net",
	"edgecastcdn.net",
	"stackpath.com",
	"cdn77.com",
	"bunnycdn.com",
	"keycdn.com",
	"staticfile.org",
];

const SUSPICIOUS: &[&str] = &[
	"free-prize-winner.com",
	"claim-your-reward.net",
	"urgent-update-required.com",
	"security-alert-login.com",
	"account-verify-now.net",
	"password-reset-urgent.com",
	"lottery-winner-2024.com",
	"free-iphone-giveaway.net",
	"click-here-money.com",
	"crypto-doubler-fast.com",
	"investment-guaranteed.net",
	"quick-loan-approve.com",
];

const MALWARE: &[&str] = &[
	"malware.testcategory.com",
	"virus-download.evil.com",
	"trojan-payload.bad.net",
	"ransomware-c2.malicious.org",
	"botnet-controller.dark.com",
	"keylogger-drop.hack.net",
	"cryptominer-pool.mine.com",
	"exploit-kit.attack.org",
	"phishing-kit.steal.net",
];

// Names expected to be sinkholed or filtered by the resolver under test
const BLOCKED: &[&str] = &[
	"doubleclick.net",
	"googlesyndication.com",
	"googleadservices.com",
	"adservice.google.com",
	"pagead2.googlesyndication.com",
	"ads.facebook.com",
	"adnxs.com",
	"moatads.com",
	"adsrvr.org",
	"google-analytics.com",
	"hotjar.com",
	"mixpanel.com",
	"malware.testcategory.com",
	"phishing.testcategory.com",
];

fn names(category: DomainCategory) -> &'static [&'static str] {
	match category {
		DomainCategory::Popular => POPULAR,
		DomainCategory::Business => BUSINESS,
		DomainCategory::Tech => TECH,
		DomainCategory::Cdn => CDN,
		DomainCategory::Suspicious => SUSPICIOUS,
		DomainCategory::Malware => MALWARE,
		DomainCategory::Blocked => BLOCKED,
		DomainCategory::Dga => &[],
	}
}

/// Return the corpus members of a category, in declaration order.
///
/// The dga category has no fixed members and yields an empty list.
pub fn domains_in(category: DomainCategory) -> Vec<DomainRecord> {
	names(category).iter()
		.map(|&name| DomainRecord { name, category })
		.collect()
}

/// Number of fixed names in a category.
pub fn category_size(category: DomainCategory) -> usize {
	names(category).len()
}

/// Pick a uniformly random corpus member of a category.
///
/// Returns None for categories without fixed members.
pub fn random_domain<R: Rng + ?Sized>(
	category: DomainCategory,
	rng: &mut R,
) -> Option<DomainRecord> {
	names(category).choose(rng)
		.map(|&name| DomainRecord { name, category })
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	#[test]
	fn test_static_categories_non_empty() {
		for category in DomainCategory::ALL {
			if category.is_synthesized() {
				continue;
			}
			assert!(!domains_in(category).is_empty(), "empty category: {}", category);
		}
	}

	#[test]
	fn test_dga_has_no_fixed_members() {
		assert!(domains_in(DomainCategory::Dga).is_empty());
		let mut rng = StdRng::seed_from_u64(1);
		assert!(random_domain(DomainCategory::Dga, &mut rng).is_none());
	}

	#[test]
	fn test_records_carry_their_category() {
		for record in domains_in(DomainCategory::Cdn) {
			assert_eq!(record.category, DomainCategory::Cdn);
		}
	}

	#[test]
	fn test_domains_are_lowercase_hostnames() {
		for category in DomainCategory::ALL {
			for record in domains_in(category) {
				assert!(record.name.contains('.'), "missing TLD: {}", record.name);
				assert!(
					record.name.chars().all(|c| c.is_ascii_lowercase()
						|| c.is_ascii_digit() || c == '.' || c == '-'),
					"invalid characters: {}", record.name,
				);
			}
		}
	}

	#[test]
	fn test_random_domain_is_member() {
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..50 {
			let record = random_domain(DomainCategory::Tech, &mut rng).unwrap();
			assert!(TECH.contains(&record.name));
		}
	}

	#[test]
	fn test_category_display() {
		assert_eq!(DomainCategory::Cdn.to_string(), "cdn");
		assert_eq!(DomainCategory::Dga.as_str(), "dga");
	}
}
