use blockmodel::fit::Interrupts;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

/// Route signals into the fitter's flags.
///
/// SIGUSR1 asks for a dump of the best model so far. The first SIGINT or
/// SIGTERM asks the sampler to stop and write what it has; a second one
/// terminates the process.
pub fn register_signal_handlers(interrupts: &Interrupts) -> anyhow::Result<()> {
    let stop = interrupts.stop_flag();
    for sig in [SIGINT, SIGTERM] {
        flag::register_conditional_shutdown(sig, 1, stop.clone())?;
        flag::register(sig, stop.clone())?;
    }

    #[cfg(unix)]
    flag::register(signal_hook::consts::SIGUSR1, interrupts.dump_flag())?;

    Ok(())
}
