/// Command summary printed at startup and by `help`
pub const HELP: &str = "
  Commands:
    devices          List audio devices
    tone [freq] [s]  Play test tone (default: 440Hz, 2s)
    left             Play tone in left channel only
    right            Play tone in right channel only
    sweep [s]        Frequency sweep 20Hz→20kHz (default: 5s)
    mic              Show mic level meter (Ctrl+C to stop)
    loopback         Mic→headphone passthrough (Ctrl+C to stop)
    output [id]      Set output device
    input [id]       Set input device
    use <line|usb>   Select devices by type
    help             Show this help
    quit             Exit

";
