use anyhow::{bail, Result};
use clap::Args;
use cmk::{AttemptOutcome, MintController, Severity};

#[derive(Args)]
pub struct MintSubCommand {
    /// Wait for the minting window to open instead of exiting
    #[arg(short, long, default_value = "false")]
    wait: bool,
}

pub async fn mint(controller: &MintController, sub_command_args: &MintSubCommand) -> Result<()> {
    if controller.identity().is_none() {
        bail!("No wallet connected, set --identity or wallet.identity in the config");
    }

    controller.start().await;

    if !controller.is_active() {
        let Some(countdown) = controller.countdown() else {
            bail!("Minting is not open");
        };

        if !sub_command_args.wait {
            bail!("Minting opens in {countdown}");
        }

        println!("Waiting {countdown} for minting to open");
        let mut display = controller.subscribe_display();
        display.wait_for(|model| model.is_active).await?;
    }

    if controller.display().is_sold_out {
        bail!("SOLD OUT!");
    }

    let Some(attempt) = controller.mint().await else {
        bail!("Mint not possible right now");
    };

    tracing::debug!("Attempt {} finished: {:?}", attempt.id, attempt.outcome);

    if let Some(signature) = &attempt.signature {
        println!("Transaction: {signature}");
    }

    if let Some(notice) = controller.display().current_notice {
        match notice.severity {
            Severity::Success | Severity::Info => println!("{}", notice.message),
            Severity::Warning | Severity::Error => eprintln!("{}", notice.message),
        }
    }

    match attempt.outcome {
        AttemptOutcome::Confirmed | AttemptOutcome::TimedOut => Ok(()),
        AttemptOutcome::Rejected(kind) => bail!("Mint rejected: {kind:?}"),
        AttemptOutcome::Pending | AttemptOutcome::Cancelled => bail!("Mint attempt did not finish"),
    }
}
