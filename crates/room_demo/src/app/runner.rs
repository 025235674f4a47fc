use std::process::ExitCode;

use room_engine::RoomPosition;
use tracing::{error, info, warn};

use super::bootstrap::{build_demo, DemoWiring};
use super::session::{tile_center, RoomSession};

pub(crate) fn run() -> ExitCode {
    let wiring = match build_demo() {
        Ok(wiring) => wiring,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = run_session(wiring) {
        error!(error = %err, "session_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Scripted pointer input over the loaded room; every tap that lands on
/// something walkable is routed from the door and printed as JSON.
fn run_session(wiring: DemoWiring) -> Result<(), String> {
    let DemoWiring {
        tilemap,
        layout,
        navigation,
        interaction,
    } = wiring;
    let mut session = RoomSession::new(tilemap, navigation, interaction)?;
    if !session.furnish(&layout)? {
        warn!("occupancy_not_committed");
    }

    let Some(door) = session.door() else {
        return Err("room has no door tile".to_string());
    };
    info!(x = door.room_x, y = door.room_y, "door_located");

    for placement in &layout.placements {
        let (x, y) = tile_center(
            placement.position.room_x,
            placement.position.room_y,
            placement.position.room_z,
        );
        session.hover(x, y);
        info!(
            furniture = %placement.furniture,
            hovered = session.hovered().len(),
            "pointer_over_furniture"
        );
        session.inspect(x, y);
        session.tap(x, y);
    }
    let far_corner = RoomPosition::new(7, 5, 0.0);
    let (x, y) = tile_center(far_corner.room_x, far_corner.room_y, far_corner.room_z);
    session.hover(x, y);
    session.tap(x, y);
    session.tap(-10_000.0, -10_000.0);

    for target in session.take_walk_requests() {
        let steps = session.route_from_door(target)?;
        info!(
            target_x = target.room_x,
            target_y = target.room_y,
            state = ?session.tile_state(target.room_x, target.room_y),
            steps = steps.len(),
            "walk_routed"
        );
        let json = serde_json::to_string(&steps).map_err(|error| format!("encode path: {error}"))?;
        println!("{json}");
    }
    Ok(())
}
