use clap::ArgMatches;

use crate::error::RenderError;

pub fn maybe_run_bench(args: &ArgMatches) -> Result<Option<i32>, RenderError> {
    // Dispatches benchmark sub-modes and returns an exit code if handled.
    if args.get_flag("bench") {
        return run_single_bench(args);
    }
    if args.get_flag("bench-sweep") {
        return run_sweep_bench(args);
    }
    Ok(None)
}

#[cfg(feature = "bench")]
fn base_config(args: &ArgMatches) -> mixchain_lib::diagnostics::bench::MixBenchConfig {
    mixchain_lib::diagnostics::bench::MixBenchConfig {
        sample_rate: 44_100,
        channels: args.get_one::<usize>("bench-channels").copied().unwrap_or(6),
        input_seconds: args
            .get_one::<f32>("bench-input-seconds")
            .copied()
            .unwrap_or(10.0),
        block_frames: args.get_one::<usize>("bench-block").copied().unwrap_or(4096),
        iterations: args.get_one::<usize>("bench-iterations").copied().unwrap_or(5),
    }
}

fn run_single_bench(_args: &ArgMatches) -> Result<Option<i32>, RenderError> {
    #[cfg(not(feature = "bench"))]
    {
        eprintln!("Benchmarking requires the `bench` feature.");
        return Ok(Some(1));
    }
    #[cfg(feature = "bench")]
    {
        let config = base_config(_args);
        let result = mixchain_lib::diagnostics::bench::bench_mixer(config);

        println!(
            "Mix bench (channels={} input={}s block={} iters={}): avg {:.2}ms (min {:.2}ms max {:.2}ms), audio {:.2}ms, rt {:.4}x, mixes {}",
            config.channels,
            config.input_seconds,
            config.block_frames,
            config.iterations,
            result.avg_ms,
            result.min_ms,
            result.max_ms,
            result.audio_time_ms,
            result.rt_factor,
            result.mixes
        );

        return Ok(Some(0));
    }
}

fn run_sweep_bench(_args: &ArgMatches) -> Result<Option<i32>, RenderError> {
    // Sweep a fixed block-size list to see how call overhead amortizes.
    #[cfg(not(feature = "bench"))]
    {
        eprintln!("Benchmarking requires the `bench` feature.");
        return Ok(Some(1));
    }
    #[cfg(feature = "bench")]
    {
        let block_sizes = [64, 256, 1024, 4096, 16384];
        let base = base_config(_args);

        let results = mixchain_lib::diagnostics::bench::bench_mixer_sweep(base, &block_sizes);
        println!(
            "Mix sweep (channels={} input={}s iters={})",
            base.channels, base.input_seconds, base.iterations
        );
        println!("block | avg_ms | min_ms | max_ms | rt_x");
        for (block, result) in results {
            println!(
                "{:>5} | {:>6.2} | {:>6.2} | {:>6.2} | {:>6.4}",
                block, result.avg_ms, result.min_ms, result.max_ms, result.rt_factor
            );
        }

        return Ok(Some(0));
    }
}
