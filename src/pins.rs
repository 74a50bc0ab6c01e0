//! GPIO / peripheral pin assignments for the CrossTrigger node board.
//!
//! `main()` references this module when it claims peripherals rather than
//! hard-coding pin numbers.  Both node roles use the same board layout.

// ---------------------------------------------------------------------------
// Motor driver (L298N-style H-bridge)
// ---------------------------------------------------------------------------

/// Digital output: H-bridge input 1.  HIGH with IN2 LOW = reverse.
pub const MOTOR_IN1_GPIO: i32 = 17;
/// Digital output: H-bridge input 2.  HIGH with IN1 LOW = forward.
pub const MOTOR_IN2_GPIO: i32 = 16;
/// LEDC PWM channel for motor enable / speed.
pub const MOTOR_ENA_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Ultrasonic distance sensor (HC-SR04)
// ---------------------------------------------------------------------------

/// Digital input: echo pulse, width proportional to distance.
pub const ULTRASONIC_ECHO_GPIO: i32 = 5;
/// Digital output: 10 µs trigger pulse.
pub const ULTRASONIC_TRIG_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Operator I/O
// ---------------------------------------------------------------------------

/// Momentary override button, active-low with internal pull-up.
pub const OVERRIDE_BUTTON_GPIO: i32 = 7;
/// Red LED lit steady while the node is disabled by the override.
pub const DISABLED_LED_GPIO: i32 = 10;

/// Episode indicator, one on/off channel per colour.
pub const RGB_RED_GPIO: i32 = 11;
pub const RGB_GREEN_GPIO: i32 = 12;
pub const RGB_BLUE_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC base frequency for the motor enable line.
pub const MOTOR_PWM_FREQ_HZ: u32 = 1_000;
