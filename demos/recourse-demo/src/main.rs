//! Recourse Demo
//!
//! Runs the same division by zero under three recovery setups:
//! 1. A handler that only logs; the signaler carries on
//! 2. A handler case around a protected block; the block is abandoned
//! 3. A handler that resumes through a restart established deeper down
//!
//! Set `RUST_LOG=recourse_core=debug` to see the engine's dispatch decisions.

use recourse_core::{
    error, handler_bind, handler_case, invoke_restart, restart_case, signal, unwind_protect,
    ConditionResult, ConditionType,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct DivideByZero;

fn div_signal(x: i32, y: i32) -> i32 {
    if y == 0 {
        signal(&DivideByZero);
        return 0;
    }
    x / y
}

fn div_error(x: i32, y: i32) -> Result<i32, DivideByZero> {
    if y == 0 {
        return error(DivideByZero);
    }
    Ok(x / y)
}

fn div_restart(x: i32, y: i32) -> ConditionResult<Result<i32, DivideByZero>> {
    restart_case(
        "ReturnValue",
        |param: i32| {
            println!("   Entering restart ReturnValue");
            println!("   Returning {} from restart", param);
            Ok(param)
        },
        || {
            println!("   Entering restart case");
            div_error(x, y)
        },
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let divide_by_zero = ConditionType::of::<DivideByZero>();

    println!("=== Recourse Condition Demo ===\n");

    println!("1. Handler bind with a signaling division");
    let r = handler_bind(
        &divide_by_zero,
        |_| println!("   Entering handler callback"),
        || {
            println!("   Entering handler bind with div_signal");
            let rv = div_signal(123, 0);
            println!("   Returning {} from body", rv);
            rv
        },
    )?;
    println!("   Return value: {}\n", r);

    println!("2. Handler case with an erroring division and unwind protect");
    let r = handler_case(
        &divide_by_zero,
        |_| {
            println!("   Entering handler callback");
            println!("   Returning 0 from handler");
            Ok(0)
        },
        || {
            println!("   Entering handler case with div_error and unwind protect");
            unwind_protect(
                || -> Result<i32, DivideByZero> {
                    println!("   Entering unwind protect");
                    let rv = div_error(123, 0)?;
                    println!("   This line should not be printed");
                    Ok(rv)
                },
                [|| println!("   Unwind protect exit point")],
            )
        },
    )?;
    match r {
        Ok(rv) => println!("   Return value: {}\n", rv),
        Err(c) => println!("   Unhandled condition: {:?}\n", c),
    }

    println!("3. Handler bind that resumes through a restart");
    let r = handler_bind(
        &divide_by_zero,
        |_| {
            println!("   Entering handler callback");
            println!("   Invoking restart ReturnValue with param = 0");
            if let Err(e) = invoke_restart("ReturnValue", 0) {
                tracing::error!("restart failed: {}", e);
            }
        },
        || {
            println!("   Entering handler bind with div_restart");
            div_restart(123, 0)
        },
    )??;
    match r {
        Ok(rv) => println!("   Return value: {}", rv),
        Err(c) => println!("   Unhandled condition: {:?}", c),
    }

    Ok(())
}
