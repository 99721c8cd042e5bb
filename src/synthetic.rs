use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::csv_io;
use crate::models::{Review, Source};

// Hand-authored BPCL feedback templates (Hinglish + English mix), one pool
// per utterance kind. Exact template reuse across rows is accepted; this is
// a pipeline test fixture, not a statistical model of the customer base.

const COMPLAINT_PATTERNS: [&str; 30] = [
    "Gas nahi aaya, where is my cylinder? @BPCLimited",
    "BharatGas delivery bahut late hai. 5 din wait kar rahe ho @BPCLimited",
    "Cylinder ka seal toot gaya delivery ke time par @BPCLimited",
    "Payment fail hua lekin paise cut gaye @BPCLimited app se",
    "HelloBPCL app bahut slow chal raha hai @BPCLimited",
    "Agent ne extra paise maange delivery ke time @BPCLimited",
    "Gas quality theek nahi lag raha cylinder se",
    "Complaint number diya 10 din pehle, abhi tak koi response nahi @BPCLimited",
    "OTP nahi aa raha HelloBPCL app se. Kya kaise book karenge?",
    "Delivery time window bilkul galat rehta hai @BPCLimited",
    "Mileage bilkul kam aa raha hai iss petrol se",
    "Service center par staff bahut rude tha",
    "Subscription plan mein hidden charges the @BPCLimited",
    "Refund process bahut complicated hai",
    "App crash ho jaata hai booking time par",
    "Pure For Sure? Nahi dikha mujhe @BPCLimited",
    "Tipping ka natija? Cylinder hi nahi milega @BPCLimited",
    "Quality degrade ho gayi recently @BPCLimited",
    "Customer service bahut bura hai",
    "Leakage issue cylinder mein @BPCLimited",
    "Seal broken tha new cylinder par",
    "Duplicate entry hai mere account mein @BPCLimited",
    "Overcharging kar rahe ho @BPCLimited",
    "Bad experience with local distributor",
    "Never again booking with BPCL",
    "Gas smell aa raha lamps se @BPCLimited",
    "Stove nahi jal raha is gas se",
    "Fitting theek se nahi karni @BPCLimited",
    "Wait time bilkul barh gayi hai",
    "Premium service par premium charges bhi @BPCLimited",
];

const PRAISE_PATTERNS: [&str; 30] = [
    "Great service from BPCL! Delivery on time always @BPCLimited",
    "HelloBPCL app bahut easy use karna @BPCLimited",
    "Staff bahut polite aur helpful tha @BPCLimited",
    "BharatGas service excellent hai @BPCLimited",
    "Quick payment process in HelloBPCL app @BPCLimited",
    "Reliable service se bahut khush hoon @BPCLimited",
    "Best LPG provider in India @BPCLimited",
    "Customer care very responsive @BPCLimited",
    "Pure For Sure! Love BPCL quality @BPCLimited",
    "Smooth booking process @BPCLimited",
    "Always on time delivery from BPCL",
    "Honest pricing, no hidden charges @BPCLimited",
    "Best company bahut lucky hoon @BPCLimited",
    "Recommended BPCL to all my friends",
    "Excellent service quality maintained",
    "Very satisfied with BharatGas service @BPCLimited",
    "Agent bahut helpful aur honest tha",
    "Digital payment process very smooth @BPCLimited",
    "Transparency bahut badiya hai @BPCLimited",
    "5 star service hamesha @BPCLimited",
    "Best in class customer experience",
    "Timely delivery always appreciated @BPCLimited",
    "Quality never compromises @BPCLimited",
    "Safest LPG provider for family",
    "App features very user friendly",
    "Support team bahut helpful @BPCLimited",
    "Worth every paisa spent @BPCLimited",
    "Consistent quality aur service @BPCLimited",
    "No complaints, all good! @BPCLimited",
    "Best choice for household gas",
];

const MIXED_PATTERNS: [&str; 15] = [
    "App badiya hai lekin delivery slow ho gaya @BPCLimited",
    "Good quality but expensive ho gaya @BPCLimited",
    "Customer care helpful tha but complaint solve nahi hua @BPCLimited",
    "Service theek hai par billing mein galti tha @BPCLimited",
    "Delivery fast tha but cylinder seal broken tha @BPCLimited",
    "Mostly good experience lekin last time late aaye @BPCLimited",
    "App user-friendly but payment fail issue @BPCLimited",
    "Quality OK but pricing badh gayi @BPCLimited",
    "Service usually good but delivery issue today @BPCLimited",
    "Decent service lekin improvement needed @BPCLimited",
    "Experience mixed - good aur bad dono @BPCLimited",
    "Previously better, now average @BPCLimited",
    "Staff helpful but process complicated @BPCLimited",
    "Value for money but quality inconsistent @BPCLimited",
    "Sometimes on time, sometimes late @BPCLimited",
];

const QUERY_PATTERNS: [&str; 15] = [
    "How to track my LPG delivery? @BPCLimited",
    "Kya booking cancel kar sakte hain? @BPCLimited",
    "Price kya hai ye month? @BPCLimited",
    "How to change address in HelloBPCL? @BPCLimited",
    "Subscription plan details kya hain? @BPCLimited",
    "Customer care number kya hai? @BPCLimited",
    "How many days wait time? @BPCLimited",
    "Can I upgrade my plan? @BPCLimited",
    "What about safety features? @BPCLimited",
    "How to apply for new connection? @BPCLimited",
    "Kya online payment safe hai? @BPCLimited",
    "Cylinder replacement procedure kya hai? @BPCLimited",
    "Valid till when is this offer? @BPCLimited",
    "Can I pause subscription? @BPCLimited",
    "What are the charges? @BPCLimited",
];

const SUGGESTION_PATTERNS: [&str; 15] = [
    "BPCL should add wallet feature in app @BPCLimited",
    "Please improve the app speed @BPCLimited",
    "Make app available in Hindi @BPCLimited",
    "Should have SMS updates for delivery @BPCLimited",
    "Better ratings system needed @BPCLimited",
    "Add live tracking feature @BPCLimited",
    "Flexible delivery time slots chahiye @BPCLimited",
    "Reduce waiting time @BPCLimited",
    "Better customer support chat @BPCLimited",
    "Loyalty rewards program launch karo @BPCLimited",
    "Improve app UI @BPCLimited",
    "Add multi-language support @BPCLimited",
    "Transparent billing system needed @BPCLimited",
    "Better grievance redressal system @BPCLimited",
    "More payment options chahiye @BPCLimited",
];

const MODIFIERS: [&str; 16] = [
    " again",
    " please fix this",
    " very frustrated",
    " need help",
    " anyone facing same issue?",
    " pls resolve asap",
    " disappointed",
    " appreciate your service",
    " thanks",
    " highly recommend",
    " never use again",
    " ok service",
    " mediocre",
    " amazing",
    " terrible",
    " really good",
];

const LOCATIONS: [&str; 8] = [
    "Delhi", "Mumbai", "Bangalore", "Pune", "Hyderabad", "Chennai", "Kolkata", "Ahmedabad",
];

fn all_patterns() -> Vec<&'static str> {
    COMPLAINT_PATTERNS
        .iter()
        .chain(PRAISE_PATTERNS.iter())
        .chain(MIXED_PATTERNS.iter())
        .chain(QUERY_PATTERNS.iter())
        .chain(SUGGESTION_PATTERNS.iter())
        .copied()
        .collect()
}

/// Pad `real` up to `target` rows with templated tweets and shuffle the
/// combined set. Early rows vary templates with a modifier suffix, the rest
/// with a location prefix.
pub fn generate<R: Rng>(real: &[Review], target: usize, now: DateTime<Utc>, rng: &mut R) -> Vec<Review> {
    let patterns = all_patterns();
    let modifier_phase = patterns.len() * 10;
    let base_date = now - Duration::days(30);

    let synth_count = target.saturating_sub(real.len());
    let mut combined: Vec<Review> = real.to_vec();

    for i in 0..synth_count {
        let base = *patterns.choose(rng).unwrap_or(&patterns[0]);
        let content = if i < modifier_phase {
            format!("{}{}", base, MODIFIERS.choose(rng).unwrap_or(&MODIFIERS[0]))
        } else {
            format!("[{}] {}", LOCATIONS.choose(rng).unwrap_or(&LOCATIONS[0]), base)
        };

        let at = base_date + Duration::hours(rng.gen_range(0..=720));
        let mut r = Review::empty(format!("twitter_synthetic_{}", i), Source::Twitter);
        r.content = content;
        r.at = format!("{}+00:00", at.naive_utc().format("%Y-%m-%dT%H:%M:%S"));
        r.thumbs_up_count = rng.gen_range(0..=100);
        r.author = Some(format!("user_{}", rng.gen_range(1000..=99999)));
        r.retweets = Some(rng.gen_range(0..=50));
        r.replies = Some(rng.gen_range(0..=20));
        combined.push(r);
    }

    combined.shuffle(rng);
    combined
}

pub fn run(input: &Path, target: usize, out_dir: &str) -> Result<PathBuf> {
    let real = csv_io::read_reviews(input)?;
    if real.is_empty() {
        bail!("Input CSV {} holds no reviews to pad", input.display());
    }
    info!("Synthetic generation started - real={}, target={}", real.len(), target);

    let mut rng = rand::thread_rng();
    let combined = generate(&real, target, Utc::now(), &mut rng);

    let path = PathBuf::from(out_dir)
        .join(format!("reviews_twitter_5k_{}.csv", csv_io::artifact_timestamp()));
    csv_io::write_reviews(&path, &combined, true)?;

    info!(
        "Synthetic generation done - total={}, real={}, synthetic={}, path={}",
        combined.len(),
        real.len(),
        combined.len() - real.len(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn real_rows(n: usize) -> Vec<Review> {
        (0..n)
            .map(|i| {
                let mut r = Review::empty(format!("real_{}", i), Source::Twitter);
                r.content = format!("actual tweet {}", i);
                r
            })
            .collect()
    }

    #[test]
    fn reaches_exactly_the_target_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();
        let out = generate(&real_rows(12), 500, now, &mut rng);
        assert_eq!(out.len(), 500);
        let real_kept = out.iter().filter(|r| r.review_id.starts_with("real_")).count();
        assert_eq!(real_kept, 12);
    }

    #[test]
    fn timestamps_fall_in_the_trailing_window() {
        let mut rng = StdRng::seed_from_u64(1);
        let now = Utc::now();
        let out = generate(&[], 50, now, &mut rng);
        let floor = (now - Duration::days(30)).naive_utc();
        for r in &out {
            let at = chrono::NaiveDateTime::parse_from_str(
                r.at.trim_end_matches("+00:00"),
                "%Y-%m-%dT%H:%M:%S",
            )
            .unwrap();
            assert!(at >= floor && at <= now.naive_utc() + Duration::hours(1));
        }
    }

    #[test]
    fn synthetic_rows_carry_twitter_metadata() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = generate(&[], 10, Utc::now(), &mut rng);
        for r in &out {
            assert_eq!(r.source, Source::Twitter);
            assert!(r.score.is_none());
            assert!(r.author.as_deref().unwrap().starts_with("user_"));
            assert!(r.thumbs_up_count <= 100);
            assert!(r.retweets.unwrap() <= 50);
            assert!(r.replies.unwrap() <= 20);
        }
    }

    #[test]
    fn early_rows_use_modifier_suffixes_not_location_prefixes() {
        let mut rng = StdRng::seed_from_u64(9);
        let out = generate(&[], 20, Utc::now(), &mut rng);
        // 20 << patterns*10, so no row should carry a location prefix
        assert!(out.iter().all(|r| !r.content.starts_with('[')));
    }
}
