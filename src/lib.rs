/*!
bgproutes-live is a client for a real-time BGP route-update feed streamed over a websocket.

The feed sends one flat JSON record per frame. This crate decodes those records into
[RouteUpdate]s and delivers them through a [Session], skipping every frame that is malformed
or lacks the mandatory record type and vantage point.

# Examples

## Stream updates for a set of prefixes

```no_run
use bgproutes_live::Session;

let session = Session::new("MY_API_KEY");
session.subscribe(["192.23.62.0/24", "2a06:3040:10::/48"]).unwrap();

for update in session {
    match update {
        Ok(update) => println!("{}", update),
        Err(e) => {
            eprintln!("stream ended: {}", e);
            break;
        }
    }
}
```

## Stop streaming from another thread

```no_run
use bgproutes_live::SessionBuilder;

let mut session = SessionBuilder::new("MY_API_KEY")
    .add_filter("kind", "withdraw")
    .unwrap()
    .build();
let cancel = session.cancel_handle();
std::thread::spawn(move || {
    std::thread::sleep(std::time::Duration::from_secs(60));
    cancel.cancel();
});

while let Some(update) = session.next_valid_update().unwrap() {
    println!("{}", update.to_psv());
}
```

## Decode a single record

```
use bgproutes_live::{decode_record, RawRecord, UpdateKind};

let record: RawRecord = r#"{"record_type":"update","vp":"64500_192.0.2.1","sec":1700000000}"#
    .parse()
    .unwrap();
let update = decode_record(&record).unwrap();
assert_eq!(update.kind, UpdateKind::Announce);
assert_eq!(update.timestamp, Some(1700000000.0));
```

# Logging

The crate logs through the [log] facade. Skipped frames are logged at the session's diagnostic
level (`Debug` unless changed with [SessionBuilder::diagnostic_level]); install any `log`
backend, e.g. `env_logger`, to see them.
*/

pub mod error;
pub mod models;
pub mod parser;
pub mod session;

pub use error::{DecodeError, FilterError, StreamError, SubscriptionError};
pub use models::{RouteUpdate, UpdateKind, VantagePoint};
pub use parser::{decode_record, Filter, Filterable, RawRecord};
pub use session::{CancelHandle, PullOutcome, Session, SessionBuilder, UpdateIter};
