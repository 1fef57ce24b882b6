criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .sample_size(20)
        .measurement_time(std::time::Duration::from_secs(2));
    targets =
        direct_sir_trajectory,
        rssacr_dimers_trajectory,
        priority_table_sampling,
        indexed_heap_update,
}

use jumpcore::aggregator::direct::DirectAggregator;
use jumpcore::aggregator::rssacr::RssacrAggregator;
use jumpcore::aggregator::Aggregator;
use jumpcore::heap::IndexedMinHeap;
use jumpcore::integrator::Integrator;
use jumpcore::priority_table::PriorityTable;
use jumpcore::rate::{JumpSet, MassActionJump};
use jumpcore::state::State;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn sir_jumps() -> JumpSet<()> {
    JumpSet::new(
        vec![
            MassActionJump::new(1e-4, vec![(0, 1), (1, 1)], vec![(0, -1), (1, 1)]),
            MassActionJump::new(0.01, vec![(1, 1)], vec![(1, -1), (2, 1)]),
        ],
        vec![],
    )
}

fn dimers_jumps() -> JumpSet<()> {
    JumpSet::new(
        vec![
            MassActionJump::new(25.0, vec![(0, 1)], vec![(1, 1)]),
            MassActionJump::new(1000.0, vec![(1, 1)], vec![(2, 1)]),
            MassActionJump::new(0.001, vec![(2, 2)], vec![(2, -2), (3, 1)]),
            MassActionJump::new(0.1, vec![(1, 1)], vec![(1, -1)]),
            MassActionJump::new(1.0, vec![(2, 1)], vec![(2, -1)]),
        ],
        vec![],
    )
}

fn direct_sir_trajectory(c: &mut criterion::Criterion) {
    c.bench_function("direct: run a 1000-host SIR trajectory to t=250", |b| {
        b.iter(|| {
            let mut agg = DirectAggregator::new(sir_jumps(), 250.0, Some(1));
            let mut integrator = Integrator::new(State::well_mixed(vec![999, 1, 0]), (), 0.0);
            agg.initialize(&mut integrator).unwrap();
            while integrator.t < 250.0 && agg.next_jump_time().is_finite() {
                integrator.t = agg.next_jump_time();
                agg.execute_jumps(&mut integrator).unwrap();
                agg.generate_jumps(&mut integrator).unwrap();
            }
        })
    });
}

fn rssacr_dimers_trajectory(c: &mut criterion::Criterion) {
    c.bench_function("rssacr: run the dimers network to t=5", |b| {
        b.iter(|| {
            let u0 = vec![1, 0, 0, 0];
            let cfg = jumpcore::config::AggregatorConfig { rng_seed: Some(11), ..Default::default() };
            let mut agg = RssacrAggregator::new(dimers_jumps(), &u0, 5.0, cfg);
            let mut integrator = Integrator::new(State::well_mixed(u0), (), 0.0);
            agg.initialize(&mut integrator).unwrap();
            while integrator.t < 5.0 && agg.next_jump_time().is_finite() {
                integrator.t = agg.next_jump_time();
                agg.execute_jumps(&mut integrator).unwrap();
                agg.generate_jumps(&mut integrator).unwrap();
            }
        })
    });
}

fn priority_table_sampling(c: &mut criterion::Criterion) {
    let mut pt = PriorityTable::new(-4, 256);
    let mut rng = SmallRng::seed_from_u64(5);
    for pid in 0..256 {
        pt.insert(pid, rng.gen::<f64>() * 100.0).unwrap();
    }
    c.bench_function("priority table: 10k weighted samples", |b| {
        b.iter(|| {
            for _ in 0..10_000 {
                pt.sample(&mut rng);
            }
        })
    });
}

fn indexed_heap_update(c: &mut criterion::Criterion) {
    let mut rng = SmallRng::seed_from_u64(6);
    let keys: Vec<f64> = (0..256).map(|_| rng.gen::<f64>() * 100.0).collect();
    c.bench_function("indexed min-heap: 10k random updates", |b| {
        b.iter(|| {
            let mut h = IndexedMinHeap::from_keys(keys.clone());
            for _ in 0..10_000 {
                let pid = rng.gen_range(0..256);
                h.update(pid, rng.gen::<f64>() * 100.0);
            }
        })
    });
}
