use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use hello_pi::app::App;
use hello_pi::app::systemd::{ServiceAction, ServiceController};
use hello_pi::cli::{PanelArgs, PanelCommand};
use hello_pi::logging;
use hello_pi::report::StatusReport;

fn main() -> Result<()> {
    let args = PanelArgs::parse();

    if let Some(path) = &args.log_file {
        logging::init_file(path, &args.common.log_level)?;
    } else if args.command.is_some() {
        logging::init_stderr(&args.common.log_level);
    }

    let controller = ServiceController::new(args.service_unit()?, args.systemctl());
    let store = args.common.store();

    let Some(command) = args.command.clone() else {
        info!("Starting control panel for {}", controller.unit().name);
        let mut app = App::new(controller, store);
        let mut terminal = ratatui::init();
        let result = app.run(&mut terminal);
        ratatui::restore();
        return result;
    };

    let report = match &command {
        PanelCommand::Status => controller.status(),
        PanelCommand::Start => controller.perform(ServiceAction::Start),
        PanelCommand::Stop => controller.perform(ServiceAction::Stop),
        PanelCommand::Restart => controller.perform(ServiceAction::Restart),
        PanelCommand::ShowConfig => {
            StatusReport::from(serde_json::to_string_pretty(&store.load()))
        }
        PanelCommand::Update { .. } => {
            let config = command.configuration().unwrap_or_default();
            let saved = store.save(&config);
            if saved.ok {
                controller.restart()
            } else {
                saved
            }
        }
    };

    if report.ok {
        if !report.message.is_empty() {
            println!("{}", report.message);
        }
        Ok(())
    } else {
        error!("{:?} failed: {}", command, report.message);
        eprintln!("{}", report.message);
        std::process::exit(1);
    }
}
