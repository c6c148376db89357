#[macro_use]
extern crate serde_derive;

mod config;

use crate::config::CONFIG;
use crossbeam_channel::{unbounded, RecvTimeoutError};
use geosearch::*;
use std::cell::RefCell;
use std::io::BufRead;
use std::rc::Rc;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(20);

fn main() {
    log::set_max_level(CONFIG.general.log_level.to_level_filter());
    pretty_env_logger::init();

    // Every line read from stdin stands for the complete content of the search box.
    let (tx, lines) = unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("Unable to read from stdin. Reason:\r\n{}", e);
                    break;
                }
            }
        }
    });

    let saved = Rc::new(RefCell::new(EntityCache::<String, Coordinates>::new()));
    let sink = saved.clone();
    let mut field = SearchField::with_client(CONFIG.search.clone(), move |selection| {
        println!(
            "Saved {} ({})",
            selection.formatted_address, selection.coordinates
        );
        sink.borrow_mut()
            .upsert(selection.full_address.clone(), selection.coordinates);
    });

    println!(
        "Type an address. `:<n>` picks a proposal, `:saved` lists saved addresses, `:quit` exits."
    );

    loop {
        match lines.recv_timeout(TICK) {
            Ok(line) => match line.trim() {
                ":quit" => break,
                ":saved" => {
                    for (address, coordinates) in saved.borrow().iter() {
                        println!("  {} ({})", address, coordinates);
                    }
                }
                command if command.starts_with(':') => match command[1..].parse::<usize>() {
                    Ok(index) => {
                        if let Err(e) = field.select(index) {
                            println!("{}", e);
                        }
                    }
                    Err(_) => println!("Unknown command {}", command),
                },
                _ => field.on_input_change(line.as_str(), Instant::now()),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        match field.update(Instant::now()) {
            Some(SearchEvent::Proposals(0)) => println!("No proposals."),
            Some(SearchEvent::Proposals(_)) => {
                for (i, label) in field.display_labels().iter().enumerate() {
                    println!("  [{}] {}", i, label);
                }
            }
            Some(SearchEvent::Failed(e)) => println!("No proposals: {}", e),
            None => {}
        }
    }

    field.teardown();
}
