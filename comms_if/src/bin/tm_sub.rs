//! Steering telemetry subscriber
//!
//! Connects to the lateral control telemetry publisher and prints each record it receives.

use comms_if::{
    net::{MonitoredSocket, SocketOptions},
    tm::SteerRecord,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "tm_sub", about = "Print steering telemetry records")]
struct Opts {
    /// Endpoint of the telemetry publisher
    #[structopt(default_value = "tcp://localhost:8594")]
    endpoint: String,

    /// Print the raw record lines instead of the decoded records
    #[structopt(long)]
    raw: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::from_args();

    // Create context
    let ctx = zmq::Context::new();

    // Create socket options, the publisher may not be up yet so don't block
    let socket_options = SocketOptions {
        block_on_first_connect: false,
        ..Default::default()
    };

    // Create socket
    let socket = MonitoredSocket::new(
        &ctx,
        zmq::SUB,
        socket_options,
        &opts.endpoint
    )?;

    // Records are not topic-prefixed, so subscribe to everything
    socket.set_subscribe(b"")?;

    println!("Listening for steering telemetry on {}", opts.endpoint);

    // Recieve messages from publisher
    loop {
        let msg = socket.recv_msg(0)?;

        let line = match msg.as_str() {
            Some(l) => l,
            None => {
                println!("Got non UTF-8 message ({} bytes)", msg.len());
                continue;
            }
        };

        if opts.raw {
            println!("{}", line);
            continue;
        }

        match line.parse::<SteerRecord>() {
            Ok(r) => println!(
                "active: {}, v_ego: {:.2} m/s, delta: {:.5} rad, angle_des: {:.3} deg, ratio: {:.2}",
                r.active, r.v_ego, r.delta_desired, r.angle_steers_des, r.steer_ratio
            ),
            Err(e) => println!("Could not parse record: {}", e)
        }
    }
}
