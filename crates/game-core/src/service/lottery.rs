//! 抽卡引擎
//!
//! 按权重从卡池中有放回地抽取。随机数源由调用方传入，测试中可以固定种子。

use rand::Rng;

use crate::cache::GachaPool;
use crate::error::{GameError, Result};
use crate::models::GachaItemMaster;

/// 从卡池中抽取 `count` 次
///
/// 每次在 `[0, weight_sum)` 内取随机数 r，按主数据 ID 顺序累加权重，
/// 取第一个累计值大于 r 的条目。权重为 0 的条目永远不会被抽中。
pub fn draw<R: Rng>(
    pool: &GachaPool,
    count: usize,
    rng: &mut R,
) -> Result<Vec<GachaItemMaster>> {
    if pool.is_empty() {
        return Err(GameError::GachaItemNotFound(pool.gacha_id));
    }
    if pool.weight_sum <= 0 {
        return Err(GameError::MisconfiguredGacha(pool.gacha_id));
    }

    let mut results = Vec::with_capacity(count);
    for _ in 0..count {
        let r = rng.random_range(0..pool.weight_sum);
        results.push(pick(pool, r)?.clone());
    }
    Ok(results)
}

fn pick(pool: &GachaPool, r: i64) -> Result<&GachaItemMaster> {
    let mut boundary = 0;
    for item in &pool.items {
        boundary += item.weight;
        if r < boundary {
            return Ok(item);
        }
    }
    // 权重和与条目不一致时才会走到这里
    Err(GameError::MisconfiguredGacha(pool.gacha_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn pool(weights: &[i64]) -> GachaPool {
        let items = weights
            .iter()
            .enumerate()
            .map(|(i, w)| GachaItemMaster {
                id: i as i64 + 1,
                gacha_id: 1,
                item_type: 2,
                item_id: 100 + i as i64,
                amount: 1,
                weight: *w,
                created_at: 0,
            })
            .collect();
        GachaPool::new(1, items)
    }

    #[test]
    fn test_frequency_converges_to_weights() {
        let pool = pool(&[10, 30, 60]);
        let mut rng = StdRng::seed_from_u64(42);
        let n = 100_000;

        let drawn = draw(&pool, n, &mut rng).unwrap();
        assert_eq!(drawn.len(), n);

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for item in &drawn {
            *counts.entry(item.id).or_default() += 1;
        }
        for (id, weight) in [(1, 10.0), (2, 30.0), (3, 60.0)] {
            let freq = counts[&id] as f64 / n as f64;
            let expected = weight / 100.0;
            assert!(
                (freq - expected).abs() < 0.01,
                "item {id}: freq={freq}, expected={expected}"
            );
        }
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let pool = pool(&[0, 5, 0, 5]);
        let mut rng = StdRng::seed_from_u64(7);

        let drawn = draw(&pool, 10_000, &mut rng).unwrap();
        assert!(drawn.iter().all(|item| item.weight > 0));
    }

    #[test]
    fn test_boundaries() {
        let pool = pool(&[10, 30, 60]);
        assert_eq!(pick(&pool, 0).unwrap().id, 1);
        assert_eq!(pick(&pool, 9).unwrap().id, 1);
        assert_eq!(pick(&pool, 10).unwrap().id, 2);
        assert_eq!(pick(&pool, 39).unwrap().id, 2);
        assert_eq!(pick(&pool, 40).unwrap().id, 3);
        assert_eq!(pick(&pool, 99).unwrap().id, 3);
    }

    #[test]
    fn test_zero_weight_sum_fails() {
        let pool = pool(&[0, 0]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            draw(&pool, 1, &mut rng),
            Err(GameError::MisconfiguredGacha(1))
        ));
    }

    #[test]
    fn test_empty_pool_fails() {
        let pool = GachaPool::new(5, Vec::new());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            draw(&pool, 10, &mut rng),
            Err(GameError::GachaItemNotFound(5))
        ));
    }
}
