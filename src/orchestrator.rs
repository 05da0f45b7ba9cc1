//! Batch generation: one concurrent round of `K` calls, then a single retry
//! round sized to the shortfall.

use crate::{
    clients::ImageGenerator,
    error::{MoodShotError, Result},
    models::{GenerationAttempt, GenerationJob, GenerationResult, MAX_COUNT, MIN_COUNT},
};
use futures::stream::{FuturesUnordered, StreamExt};
use rand::Rng;
use std::collections::HashSet;

/// Exclusive upper bound of a seed; seeds are 31-bit.
pub const SEED_LIMIT: u32 = i32::MAX as u32;

/// Draws `n` seeds not present in `used`, recording them there.
pub fn fresh_seeds(n: usize, used: &mut HashSet<u32>) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    let mut seeds = Vec::with_capacity(n);
    while seeds.len() < n {
        let seed = rng.gen_range(0..SEED_LIMIT);
        if used.insert(seed) {
            seeds.push(seed);
        }
    }
    seeds
}

/// Runs every seed concurrently and records the outcomes in completion order.
async fn run_round(
    generator: &dyn ImageGenerator,
    job: &GenerationJob,
    seeds: Vec<u32>,
    round: u8,
) -> Vec<GenerationAttempt> {
    let mut in_flight: FuturesUnordered<_> = seeds
        .into_iter()
        .map(|seed| async move {
            let url = generator.generate(job, seed).await;
            GenerationAttempt { seed, round, url }
        })
        .collect();

    let mut attempts = Vec::new();
    while let Some(attempt) = in_flight.next().await {
        attempts.push(attempt);
    }
    attempts
}

pub async fn generate_batch(
    generator: &dyn ImageGenerator,
    job: &GenerationJob,
    requested: usize,
) -> Result<GenerationResult> {
    let requested = requested.clamp(MIN_COUNT, MAX_COUNT);
    let mut used = HashSet::new();

    let seeds = fresh_seeds(requested, &mut used);
    let mut attempts = run_round(generator, job, seeds, 1).await;
    let mut images: Vec<String> = attempts.iter().filter_map(|a| a.url.clone()).collect();
    let mut rounds = 1;

    log::info!("Round 1: {}/{} generations succeeded", images.len(), requested);

    if images.len() < requested {
        let shortfall = requested - images.len();
        log::warn!("Retrying shortfall of {} generation(s)", shortfall);

        let seeds = fresh_seeds(shortfall, &mut used);
        let retry = run_round(generator, job, seeds, 2).await;
        images.extend(retry.iter().filter_map(|a| a.url.clone()));
        attempts.extend(retry);
        rounds = 2;

        log::info!("Round 2: {} total successes after retry", images.len());
    }

    images.truncate(requested);

    if images.is_empty() {
        return Err(MoodShotError::TotalGenerationFailure { requested });
    }

    Ok(GenerationResult {
        images,
        requested,
        rounds,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelPreset, ReferenceUrls};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Succeeds unless the call index is listed in `fail_calls`.
    struct ScriptedGenerator {
        calls: AtomicUsize,
        fail_calls: Vec<usize>,
        fail_all: bool,
        seeds: Mutex<Vec<u32>>,
    }

    impl ScriptedGenerator {
        fn failing(fail_calls: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_calls,
                fail_all: false,
                seeds: Mutex::new(Vec::new()),
            }
        }

        fn always_failing() -> Self {
            Self {
                fail_all: true,
                ..Self::failing(Vec::new())
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedGenerator {
        async fn generate(&self, _job: &GenerationJob, seed: u32) -> Option<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seeds.lock().unwrap().push(seed);
            if self.fail_all || self.fail_calls.contains(&call) {
                None
            } else {
                Some(format!("http://x/{}.png", seed))
            }
        }
    }

    fn job() -> GenerationJob {
        GenerationJob {
            prompt: "p".into(),
            negative_prompt: "n".into(),
            references: ReferenceUrls {
                background: "b".into(),
                product: "p".into(),
                composition: "c".into(),
            },
            preset: ModelPreset::default_preset(),
        }
    }

    #[tokio::test]
    async fn test_all_succeed_returns_k_distinct() {
        for k in MIN_COUNT..=MAX_COUNT {
            let generator = ScriptedGenerator::failing(Vec::new());
            let result = generate_batch(&generator, &job(), k).await.unwrap();
            assert_eq!(result.count(), k);
            assert_eq!(result.rounds, 1);
            assert_eq!(generator.calls(), k);
            let distinct: HashSet<_> = result.images.iter().collect();
            assert_eq!(distinct.len(), k);
        }
    }

    #[tokio::test]
    async fn test_single_failure_retried_once() {
        let generator = ScriptedGenerator::failing(vec![2]);
        let result = generate_batch(&generator, &job(), 4).await.unwrap();
        assert_eq!(result.count(), 4);
        assert_eq!(result.rounds, 2);
        assert_eq!(generator.calls(), 5);
        assert_eq!(result.attempts.iter().filter(|a| a.round == 2).count(), 1);
    }

    #[tokio::test]
    async fn test_partial_retry_returns_short_list() {
        // Round 1: calls 0..4, two fail. Round 2: calls 4..6, one fails.
        let generator = ScriptedGenerator::failing(vec![0, 1, 4]);
        let result = generate_batch(&generator, &job(), 4).await.unwrap();
        assert_eq!(result.count(), 3);
        assert!(result.is_short());
        assert_eq!(result.rounds, 2);
        assert_eq!(generator.calls(), 6);
    }

    #[tokio::test]
    async fn test_total_failure_stops_after_two_rounds() {
        let generator = ScriptedGenerator::always_failing();
        let err = generate_batch(&generator, &job(), 8).await.unwrap_err();
        assert!(matches!(
            err,
            MoodShotError::TotalGenerationFailure { requested: 8 }
        ));
        assert_eq!(generator.calls(), 16);
    }

    #[tokio::test]
    async fn test_requested_is_clamped() {
        let generator = ScriptedGenerator::failing(Vec::new());
        let result = generate_batch(&generator, &job(), 0).await.unwrap();
        assert_eq!(result.count(), 1);

        let generator = ScriptedGenerator::failing(Vec::new());
        let result = generate_batch(&generator, &job(), 99).await.unwrap();
        assert_eq!(result.count(), 8);
    }

    #[tokio::test]
    async fn test_retry_uses_fresh_seeds() {
        let generator = ScriptedGenerator::failing(vec![0, 1, 2]);
        generate_batch(&generator, &job(), 3).await.unwrap();
        let seeds = generator.seeds.lock().unwrap();
        assert_eq!(seeds.len(), 6);
        let distinct: HashSet<_> = seeds.iter().collect();
        assert_eq!(distinct.len(), 6);
        assert!(seeds.iter().all(|seed| *seed < SEED_LIMIT));
    }

    /// Only returns once `barrier` has seen every call of the round.
    struct GatedGenerator {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl ImageGenerator for GatedGenerator {
        async fn generate(&self, _job: &GenerationJob, seed: u32) -> Option<String> {
            self.barrier.wait().await;
            Some(format!("http://x/{}.png", seed))
        }
    }

    #[tokio::test]
    async fn test_round_calls_are_in_flight_together() {
        for k in [2, 4, 8] {
            let generator = GatedGenerator {
                barrier: tokio::sync::Barrier::new(k),
            };
            let result = tokio::time::timeout(
                Duration::from_secs(5),
                generate_batch(&generator, &job(), k),
            )
            .await
            .expect("round calls did not overlap")
            .unwrap();
            assert_eq!(result.count(), k);
        }
    }

    /// Later calls finish sooner: call `i` of `n` sleeps `(n - 1 - i) * step`.
    struct StaggeredGenerator {
        calls: AtomicUsize,
        n: usize,
    }

    #[async_trait]
    impl ImageGenerator for StaggeredGenerator {
        async fn generate(&self, _job: &GenerationJob, _seed: u32) -> Option<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = (self.n - 1 - call) as u64 * 40;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Some(format!("http://x/{}ms.png", delay))
        }
    }

    #[tokio::test]
    async fn test_images_follow_completion_order() {
        let generator = StaggeredGenerator {
            calls: AtomicUsize::new(0),
            n: 4,
        };
        let result = generate_batch(&generator, &job(), 4).await.unwrap();
        assert_eq!(
            result.images,
            vec![
                "http://x/0ms.png",
                "http://x/40ms.png",
                "http://x/80ms.png",
                "http://x/120ms.png",
            ]
        );
    }
}
