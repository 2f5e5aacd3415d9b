use std::process::ExitCode;

fn main() -> ExitCode {
    match sensor_curves::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sensorfit: {}", err.message());
            ExitCode::from(err.exit_code())
        }
    }
}
