use apiary_core::caste::CasteTable;
use apiary_core::config::{FieldConfig, MovementConfig, ResourceConfig, WorldConfig};
use apiary_core::field::PheromoneField;
use apiary_core::kernels::{detailed_kernel, KernelCtx};
use apiary_core::pool::{AgentRow, Tier, TierArrays};
use apiary_core::resources::ResourceSet;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

prop_compose! {
    fn arb_position()(
        x in 0.0f32..1000.0,
        y in 0.0f32..1000.0
    ) -> (f32, f32) {
        (x, y)
    }
}

prop_compose! {
    fn arb_velocity()(
        vx in -500.0f32..500.0,
        vy in -500.0f32..500.0
    ) -> (f32, f32) {
        (vx, vy)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_kernel_restores_speed_bound(
        (px, py) in arb_position(),
        (vx, vy) in arb_velocity(),
        caste in 0u8..3,
        seed in 0u64..1000
    ) {
        let world = WorldConfig::default();
        let movement = MovementConfig::default();
        let castes = CasteTable::default();
        let field = PheromoneField::new(&FieldConfig::default(), world.width, world.height);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut arr = TierArrays::with_capacity(1);
        arr.push(Tier::Detailed, AgentRow {
            px, py, vx, vy, caste, maturity: 0.0, flags: 0,
        }).unwrap();

        let ctx = KernelCtx {
            movement: &movement,
            world: &world,
            castes: &castes,
            dt: 1.0 / 30.0,
        };
        let (mut pos, mut grad) = (Vec::new(), Vec::new());
        detailed_kernel(&mut arr, &field, &ctx, &mut rng, &mut pos, &mut grad);

        let limit = movement.max_speed * castes.bias_by_id(caste).speed_mult;
        let speed = (arr.vx[0] * arr.vx[0] + arr.vy[0] * arr.vy[0]).sqrt();
        prop_assert!(speed <= limit * 1.001,
            "speed {} exceeds caste limit {}", speed, limit);
        prop_assert!((0.0..=world.width).contains(&arr.px[0]));
        prop_assert!((0.0..=world.height).contains(&arr.py[0]));
    }

    #[test]
    fn test_gradient_samples_bounded_everywhere(
        deposits in prop::collection::vec(arb_position(), 1..50),
        probes in prop::collection::vec(arb_position(), 1..20),
        amplitude in 0.1f32..4.0
    ) {
        let cfg = FieldConfig::default();
        let mut field = PheromoneField::new(&cfg, 1000.0, 1000.0);
        field.deposit(&deposits, amplitude);
        field.update();

        for (gx, gy) in field.sample_gradient(&probes) {
            let mag = (gx * gx + gy * gy).sqrt();
            prop_assert!(mag <= cfg.gradient_clamp + 1e-4,
                "gradient magnitude {} above clamp", mag);
            prop_assert!(gx.is_finite() && gy.is_finite());
        }
        prop_assert!(field.cells().iter().all(|&c| (0.0..=cfg.ceiling).contains(&c)));
    }

    #[test]
    fn test_stock_stays_bounded_under_any_schedule(
        agents in prop::collection::vec(arb_position(), 1..40),
        rounds in 1usize..30,
        seed in 0u64..1000
    ) {
        let cfg = ResourceConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut set = ResourceSet::new(&cfg, 1000.0, 1000.0, 500.0, 500.0, &mut rng);

        for _ in 0..rounds {
            let harvested = set.harvest(&agents, cfg.harvest_base, &mut rng);
            for h in harvested {
                prop_assert!(h >= 0.0);
            }
            for &s in set.stock() {
                prop_assert!((0.0..=cfg.max_stock).contains(&s));
            }
            set.update(1.0 / 30.0);
        }
    }
}
