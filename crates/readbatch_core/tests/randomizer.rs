use rand::rngs::StdRng;
use rand::SeedableRng;
use readbatch_core::{correlated_time, randomize, ReadingRanges};

fn ranges(min_time: u32, max_time: u32, min_percent: u32, max_percent: u32) -> ReadingRanges {
    ReadingRanges {
        min_time,
        max_time,
        min_percent,
        max_percent,
        min_questions: 2,
        max_questions: 8,
    }
}

#[test]
fn draws_stay_within_configured_ranges() {
    let mut rng = StdRng::seed_from_u64(7);
    let configs = [
        ranges(10, 60, 0, 100),
        ranges(1, 1, 40, 90),
        ranges(5, 120, 100, 100),
        ranges(30, 31, 0, 1),
    ];

    for config in configs {
        for _ in 0..500 {
            let targets = randomize(&config, &mut rng);
            assert!((config.min_time..=config.max_time).contains(&targets.read_time));
            assert!((config.min_percent..=config.max_percent).contains(&targets.read_percentage));
            assert!((config.min_questions..=config.max_questions).contains(&targets.max_questions));
        }
    }
}

#[test]
fn single_point_time_range_is_fixed() {
    let mut rng = StdRng::seed_from_u64(11);
    let config = ranges(25, 25, 0, 100);
    for _ in 0..200 {
        assert_eq!(randomize(&config, &mut rng).read_time, 25);
    }
}

#[test]
fn full_percentage_maps_to_top_of_time_window() {
    let mut rng = StdRng::seed_from_u64(3);
    let config = ranges(10, 60, 0, 100);
    for _ in 0..200 {
        let time = correlated_time(&config, 100, &mut rng);
        assert!((53..=60).contains(&time), "time {time} outside window");
    }
}

#[test]
fn lowest_percentage_maps_to_bottom_of_time_window() {
    let mut rng = StdRng::seed_from_u64(5);
    let config = ranges(10, 60, 0, 100);
    for _ in 0..200 {
        let time = correlated_time(&config, 0, &mut rng);
        assert!((10..=17).contains(&time), "time {time} outside window");
    }
}

#[test]
fn single_point_percentage_centres_the_window() {
    let mut rng = StdRng::seed_from_u64(9);
    let config = ranges(10, 60, 80, 80);
    for _ in 0..200 {
        let time = correlated_time(&config, 80, &mut rng);
        // target 35, half window 7.5
        assert!((28..=42).contains(&time), "time {time} outside window");
    }
}

#[test]
fn same_seed_gives_same_targets() {
    let config = ranges(10, 60, 0, 100);
    let first = randomize(&config, &mut StdRng::seed_from_u64(42));
    let second = randomize(&config, &mut StdRng::seed_from_u64(42));
    assert_eq!(first, second);
}
